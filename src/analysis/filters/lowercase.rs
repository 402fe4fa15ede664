use crate::analysis::pipeline::{PipelineContext, PipelineStage};
use crate::analysis::token::Token;
use crate::core::error::Result;

pub struct LowercaseStage;

impl PipelineStage for LowercaseStage {
    fn apply(&self, tokens: Vec<Token>, _ctx: &PipelineContext) -> Result<Vec<Token>> {
        Ok(tokens
            .into_iter()
            .map(|token| {
                let lowered = token.value.to_lowercase();
                token.rewritten(lowered)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "lowercase"
    }
}

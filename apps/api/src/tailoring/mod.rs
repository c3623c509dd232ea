// Resume tailoring: generation, evaluation, factuality checking, revision,
// and the revise-until-threshold pipeline that strings them together.
// All LLM calls go through llm_client.

pub mod evaluator;
pub mod factuality;
pub mod generator;
pub mod handlers;
pub mod keywords;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod reviser;

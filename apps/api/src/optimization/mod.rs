pub mod batch;
pub mod handlers;
pub mod optimizer;
pub mod parser;
pub mod prompts;
#[cfg(test)]
pub mod testing;

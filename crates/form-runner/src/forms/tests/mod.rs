mod common;
mod processor;

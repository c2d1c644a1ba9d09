mod common;
mod eval_tests;

mod definitions_tests;
mod evaluation_tests;

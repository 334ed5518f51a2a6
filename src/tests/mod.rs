mod dedup_tests;
mod jacobian_tests;
mod parametric_tests;

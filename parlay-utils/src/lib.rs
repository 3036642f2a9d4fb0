pub mod errors;
pub mod execute_main;

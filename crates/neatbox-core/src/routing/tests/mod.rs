// Routing test module
#[cfg(test)]
mod collection_tests;

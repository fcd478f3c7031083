// HTTP test module
#[cfg(test)]
mod cookie_tests;
#[cfg(test)]
mod response_tests;

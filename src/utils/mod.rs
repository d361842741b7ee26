pub mod log;
pub mod time;

#[cfg(test)]
pub mod test_utils;

//! Assertion helpers for testing
//!
//! Custom assertion macros that name the offending path or value on failure.

/// Assert that a directory exists
#[macro_export]
macro_rules! assert_dir_exists {
    ($path:expr) => {
        assert!(
            $path.is_dir(),
            "Directory should exist: {}",
            $path.display()
        );
    };
}

/// Assert that a result is Ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(err) => panic!("Expected Ok, got Err: {:?}", err),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => value,
            Err(err) => panic!("{}: {:?}", $msg, err),
        }
    };
}

/// Assert that a result is Err and return the error
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(err) => err,
        }
    };
}

// Process exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_GENERIC_FAIL: i32 = 1;
pub const EXIT_INIT_FAIL: i32 = 2;
pub const EXIT_CONFIG_FAIL: i32 = 3;

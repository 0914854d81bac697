pub const APP_NAME: &str = "nob";

/// Status code reported for children that did not exit normally: killed by a
/// signal, or never launched because the program could not be found or executed.
pub const ABNORMAL_EXIT: i32 = -1;

/// Read size for draining a captured child's stdout.
pub const CAPTURE_CHUNK_SIZE: usize = 4096;

pub const ENV_CARGO: &str = "NOB_CARGO";
pub const ENV_RUSTC: &str = "NOB_RUSTC";
pub const ENV_RUSTFLAGS: &str = "NOB_RUSTFLAGS";
pub const ENV_CURL: &str = "NOB_CURL";
pub const ENV_TAR: &str = "NOB_TAR";
pub const ENV_GUNZIP: &str = "NOB_GUNZIP";
pub const ENV_BZIP2: &str = "NOB_BZIP2";
pub const ENV_UNZIP: &str = "NOB_UNZIP";

//! Collision-resistant names for generated files.

use crate::Timestamp;
use rand::Rng;

/// Length of the random suffix appended to generated filenames.
pub const RANDOM_SUFFIX_LEN: usize = 10;

/// Random string of `len` lowercase ASCII letters.
pub fn random_lowercase(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}

/// `report-<YYYY_MM_DD_HH_MM_SS><10 lowercase letters>.<ext>`
pub fn report_filename(stamp: &Timestamp, ext: &str) -> String {
    format!(
        "report-{}{}.{}",
        stamp.to_filename_stamp(),
        random_lowercase(RANDOM_SUFFIX_LEN),
        ext
    )
}

/// Default scan output file: `results/results_<stamp>_<10 lowercase letters>.html`.
pub fn results_filename(stamp: &Timestamp) -> String {
    format!(
        "results/results_{}_{}.html",
        stamp.to_filename_stamp(),
        random_lowercase(RANDOM_SUFFIX_LEN)
    )
}

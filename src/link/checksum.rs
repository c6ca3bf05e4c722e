//! # Body Checksum
//!
//! Additive checksum used as the serial frame footer: the sum of all body
//! bytes modulo 256.

/// Calculate the frame body checksum
///
/// # Arguments
///
/// * `data` - Frame body bytes
///
/// # Returns
///
/// * `u8` - Sum of all bytes, wrapping at 256
///
/// # Examples
///
/// ```
/// use robot_arm_controller::link::checksum::body_checksum;
///
/// assert_eq!(body_checksum(&[130, 64]), 194);
/// assert_eq!(body_checksum(&[200, 100]), 44);
/// ```
pub fn body_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

/// Verify a body against its checksum
///
/// # Arguments
///
/// * `data` - Frame body bytes
/// * `expected` - Checksum from the frame footer
pub fn verify_checksum(data: &[u8], expected: u8) -> bool {
    body_checksum(data) == expected
}

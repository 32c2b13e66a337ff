//! The host's crypt(3)
//!
//! Hash formats `pwhash` does not implement (yescrypt `$y$`, gost-yescrypt
//! `$gy$`, scrypt `$7$`) are handed to libxcrypt, which is what wrote them
//! into the shadow file in the first place.

/// Hash `password` with the algorithm and salt encoded in `setting`
///
/// `None` when the host library does not know the format.
#[cfg(target_os = "linux")]
pub fn host_crypt(password: &str, setting: &str) -> Option<String> {
    use parking_lot::Mutex;
    use std::ffi::{CStr, CString};

    // crypt(3) returns a pointer into a static buffer
    static CRYPT_LOCK: Mutex<()> = parking_lot::const_mutex(());

    let phrase = CString::new(password).ok()?;
    let setting = CString::new(setting).ok()?;

    let _guard = CRYPT_LOCK.lock();
    // SAFETY: both arguments are NUL-terminated and outlive the call; the
    // result is copied out before the lock is released.
    let hashed = unsafe {
        let out = ffi::crypt(phrase.as_ptr(), setting.as_ptr());
        if out.is_null() {
            return None;
        }
        CStr::from_ptr(out).to_string_lossy().into_owned()
    };

    // libxcrypt reports failure with a "*0" / "*1" token
    (!hashed.starts_with('*')).then_some(hashed)
}

#[cfg(not(target_os = "linux"))]
pub fn host_crypt(_password: &str, _setting: &str) -> Option<String> {
    None
}

#[cfg(target_os = "linux")]
mod ffi {
    use std::ffi::c_char;

    #[link(name = "crypt")]
    extern "C" {
        pub fn crypt(phrase: *const c_char, setting: *const c_char) -> *mut c_char;
    }
}

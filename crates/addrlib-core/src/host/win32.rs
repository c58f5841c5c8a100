//! Host module backed by the current Windows process image.

use std::ffi::c_void;
use std::path::{Path, PathBuf};

use tracing::debug;
use windows::Win32::Storage::FileSystem::{
    GetFileVersionInfoSizeW, GetFileVersionInfoW, VerQueryValueW,
};
use windows::Win32::System::LibraryLoader::{GetModuleFileNameW, GetModuleHandleW};
use windows::core::{HSTRING, PCWSTR};

use super::HostModule;
use crate::error::{Error, Result};
use crate::version::Version;

const PRODUCT_VERSION_KEY: &str = r"\StringFileInfo\040904B0\ProductVersion";

fn win32_error(context: &str, err: windows::core::Error) -> Error {
    Error::Io(std::io::Error::other(format!("{context}: {err}")))
}

/// The executable that started the current process
#[derive(Debug, Clone)]
pub struct CurrentModule {
    base: usize,
    path: PathBuf,
    version: Version,
}

impl CurrentModule {
    pub fn detect() -> Result<Self> {
        // SAFETY: a null name returns the handle of the process executable,
        // which stays loaded for the life of the process.
        let handle = unsafe { GetModuleHandleW(PCWSTR::null()) }
            .map_err(|e| win32_error("GetModuleHandleW", e))?;

        let mut buffer = vec![0u16; 4096];
        // SAFETY: the buffer is writable and its length is passed along.
        let len = unsafe { GetModuleFileNameW(handle, &mut buffer) } as usize;
        if len == 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        let path = PathBuf::from(String::from_utf16_lossy(&buffer[..len]));
        let version = file_version(&path)?;
        let base = handle.0 as usize;

        debug!(
            "Host module {} (base: 0x{:X}, version: {})",
            path.display(),
            base,
            version
        );

        Ok(Self {
            base,
            path,
            version,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HostModule for CurrentModule {
    fn base(&self) -> usize {
        self.base
    }

    fn version(&self) -> Version {
        self.version
    }
}

/// Read the `ProductVersion` string resource of `path`.
pub fn file_version(path: &Path) -> Result<Version> {
    let file_name = HSTRING::from(path.as_os_str());

    // SAFETY: the file name is a valid null-terminated wide string.
    let size = unsafe { GetFileVersionInfoSizeW(&file_name, None) };
    if size == 0 {
        return Err(Error::InvalidVersion(format!(
            "no version resource in {}",
            path.display()
        )));
    }

    let mut data = vec![0u8; size as usize];
    // SAFETY: `data` holds `size` writable bytes.
    unsafe { GetFileVersionInfoW(&file_name, 0, size, data.as_mut_ptr().cast::<c_void>()) }
        .map_err(|e| win32_error("GetFileVersionInfoW", e))?;

    let mut value: *mut c_void = std::ptr::null_mut();
    let mut value_len = 0u32;
    let key = HSTRING::from(PRODUCT_VERSION_KEY);
    // SAFETY: `data` is the block filled above; the returned pointer points into it.
    let found = unsafe {
        VerQueryValueW(
            data.as_ptr().cast::<c_void>(),
            &key,
            &mut value,
            &mut value_len,
        )
    };
    if !found.as_bool() || value.is_null() {
        return Err(Error::InvalidVersion(format!(
            "no ProductVersion in {}",
            path.display()
        )));
    }

    // SAFETY: VerQueryValueW reports the string length in UTF-16 units, inside `data`.
    let wide = unsafe { std::slice::from_raw_parts(value.cast::<u16>(), value_len as usize) };
    let text = String::from_utf16_lossy(wide);
    text.trim_end_matches('\0').parse()
}

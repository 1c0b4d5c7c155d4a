//! Minimal KC-Riff native binding, compiled with `rustc --crate-type cdylib` by the native
//! selection tests.
//!
//! `--cfg go_names` exports the spellings of the Go-built library and `--cfg without_health`
//! leaves out the health-check entry point.

#![allow(non_snake_case)]

use std::ffi::{c_char, CStr, CString};
use std::ptr;

// Replies are leaked; the caller copies them and the process is short-lived.
fn reply(text: String) -> *const c_char {
    match CString::new(text) {
        Ok(text) => text.into_raw(),
        Err(_) => ptr::null(),
    }
}

fn arg(name: *const c_char) -> String {
    if name.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
}

#[no_mangle]
pub extern "C" fn GetModels() -> *const c_char {
    reply(r#"[{"name":"mistral-7b","kc_recommended":true}]"#.to_string())
}

#[cfg_attr(not(go_names), export_name = "StartModelDownload")]
#[cfg_attr(go_names, export_name = "DownloadModel")]
pub extern "C" fn start_download(name: *const c_char) -> *const c_char {
    reply(format!(r#"{{"status":"downloading","model":"{}"}}"#, arg(name)))
}

#[no_mangle]
pub extern "C" fn GetDownloadStatus(name: *const c_char) -> *const c_char {
    reply(format!(
        r#"{{"model_name":"{}","progress":40.0,"completed":false,"status":"downloading"}}"#,
        arg(name)
    ))
}

#[no_mangle]
pub extern "C" fn RemoveModel(name: *const c_char) -> *const c_char {
    if arg(name) == "ghost" {
        return ptr::null();
    }
    reply(format!(r#"{{"status":"removed","model":"{}"}}"#, arg(name)))
}

#[cfg_attr(not(go_names), export_name = "CheckForUpdates")]
#[cfg_attr(go_names, export_name = "CheckForUpdatesC")]
pub extern "C" fn check_for_updates() -> *const c_char {
    reply(r#"{"available":false,"current_version":"0.1.0"}"#.to_string())
}

#[no_mangle]
pub extern "C" fn ApplyUpdate() -> *const c_char {
    reply(r#"{"error":"No update available"}"#.to_string())
}

#[cfg(not(without_health))]
#[cfg_attr(not(go_names), export_name = "HealthCheck")]
#[cfg_attr(go_names, export_name = "GetHealthCheck")]
pub extern "C" fn health_check() -> *const c_char {
    reply(r#"{"status":"healthy","version":"fixture"}"#.to_string())
}

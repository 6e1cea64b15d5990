//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Inputs
//! - Template, variables and blocks are passed as UTF-8 JSON byte ranges
//!   (pointer + length, not necessarily null-terminated).
//! - Variables and blocks are optional: pass a null pointer to omit them.
//!
//! ## Memory management
//! - Buffers returned by `pf_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `pf_free_buffer` / `pf_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int`:
//!   `0` success, `1` null pointer, `2` invalid UTF-8,
//!   `3` invalid input JSON or template, `4` render failure.
//! - Error details can be retrieved via `pf_last_error`.
//!
//! ## Thread safety
//! - `pf_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -lplate_forge
//! // #include "plate_forge.h"
//! import "C"
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use crate::error::ForgeError;
use crate::fonts::FontManager;
use crate::io::{blocks_from_json, template_from_json};
use crate::layout_config::PaginatedDocument;
use crate::model::{Block, Template, Variables};
use crate::pipeline::{compute_layout, generate_pdf, render_document, ExportConfig};
use crate::render::PdfRenderer;

const PF_OK: c_int = 0;
const PF_NULL_POINTER: c_int = 1;
const PF_INVALID_UTF8: c_int = 2;
const PF_INVALID_INPUT: c_int = 3;
const PF_RENDER_FAILED: c_int = 4;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Borrow a UTF-8 string from a byte range. A null pointer yields `None`.
///
/// # Safety
/// `ptr`, if non-null, must point to `len` readable bytes.
unsafe fn optional_str<'a>(ptr: *const u8, len: u32) -> Result<Option<&'a str>, c_int> {
    if ptr.is_null() {
        return Ok(None);
    }
    let bytes = slice::from_raw_parts(ptr, len as usize);
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(Some(s)),
        Err(e) => {
            set_last_error(&format!("Invalid UTF-8: {e}"));
            Err(PF_INVALID_UTF8)
        }
    }
}

struct Inputs {
    template: Template,
    variables: Variables,
    blocks: BTreeMap<String, Block>,
}

fn parse_inputs(
    template: &str,
    variables: Option<&str>,
    blocks: Option<&str>,
) -> Result<Inputs, ForgeError> {
    Ok(Inputs {
        template: template_from_json(template)?,
        variables: match variables {
            Some(json) => serde_json::from_str(json)?,
            None => Variables::new(),
        },
        blocks: match blocks {
            Some(json) => blocks_from_json(json)?,
            None => BTreeMap::new(),
        },
    })
}

/// Decode all three inputs, setting the last error on failure.
///
/// # Safety
/// Every non-null pointer must point to the corresponding number of bytes.
unsafe fn read_inputs(
    template_ptr: *const u8,
    template_len: u32,
    vars_ptr: *const u8,
    vars_len: u32,
    blocks_ptr: *const u8,
    blocks_len: u32,
) -> Result<Inputs, c_int> {
    let Some(template) = optional_str(template_ptr, template_len)? else {
        set_last_error("Null pointer argument");
        return Err(PF_NULL_POINTER);
    };
    let variables = optional_str(vars_ptr, vars_len)?;
    let blocks = optional_str(blocks_ptr, blocks_len)?;

    parse_inputs(template, variables, blocks).map_err(|e| {
        set_last_error(&e.to_string());
        PF_INVALID_INPUT
    })
}

/// Hand `bytes` to the caller as a raw boxed slice.
///
/// # Safety
/// `out_buf` and `out_len` must be valid for writes.
unsafe fn write_buffer(bytes: Vec<u8>, out_buf: *mut *mut u8, out_len: *mut u32) {
    let len = bytes.len() as u32;
    let buf = bytes.into_boxed_slice();
    *out_buf = Box::into_raw(buf) as *mut u8;
    *out_len = len;
}

/// # Safety
/// `out_json_ptr` must be valid for writes.
unsafe fn write_json(json: String, out_json_ptr: *mut *mut c_char) -> c_int {
    match CString::new(json) {
        Ok(cs) => {
            *out_json_ptr = cs.into_raw();
            PF_OK
        }
        Err(_) => {
            *out_json_ptr = ptr::null_mut();
            set_last_error("JSON contained null byte");
            PF_INVALID_INPUT
        }
    }
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Export a template to PDF.
///
/// # Parameters
/// - `template_ptr`, `template_len`: template JSON (required)
/// - `vars_ptr`, `vars_len`: global variables JSON object (optional)
/// - `blocks_ptr`, `blocks_len`: block JSON, one block or an array (optional)
/// - `out_buf`, `out_len`: on success, the heap-allocated PDF bytes
///
/// # Returns
/// `0` on success, non-zero on error. On error, call `pf_last_error`.
///
/// # Safety
/// - Every non-null input pointer must point to the given number of bytes.
/// - `out_buf` and `out_len` must be valid pointers.
/// - The caller must free `*out_buf` by calling `pf_free_buffer`.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn pf_generate_pdf(
    template_ptr: *const u8,
    template_len: u32,
    vars_ptr: *const u8,
    vars_len: u32,
    blocks_ptr: *const u8,
    blocks_len: u32,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return PF_NULL_POINTER;
    }
    let inputs = match read_inputs(template_ptr, template_len, vars_ptr, vars_len, blocks_ptr, blocks_len) {
        Ok(inputs) => inputs,
        Err(code) => return code,
    };

    match generate_pdf(&inputs.template, &inputs.blocks, &inputs.variables, &ExportConfig::default()) {
        Ok((pdf_bytes, _document)) => {
            write_buffer(pdf_bytes, out_buf, out_len);
            PF_OK
        }
        Err(e) => {
            set_last_error(&e.to_string());
            PF_RENDER_FAILED
        }
    }
}

/// Compute only the paginated layout (no PDF rendering). Returns JSON.
///
/// # Parameters
/// - template, variables and blocks as for `pf_generate_pdf`
/// - `out_json_ptr`: receives a null-terminated JSON string
///
/// # Returns
/// `0` on success.
///
/// # Safety
/// Same as `pf_generate_pdf`. `*out_json_ptr` must be freed with
/// `pf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pf_compute_layout(
    template_ptr: *const u8,
    template_len: u32,
    vars_ptr: *const u8,
    vars_len: u32,
    blocks_ptr: *const u8,
    blocks_len: u32,
    out_json_ptr: *mut *mut c_char,
) -> c_int {
    if out_json_ptr.is_null() {
        set_last_error("Null pointer argument");
        return PF_NULL_POINTER;
    }
    let inputs = match read_inputs(template_ptr, template_len, vars_ptr, vars_len, blocks_ptr, blocks_len) {
        Ok(inputs) => inputs,
        Err(code) => return code,
    };

    let document = compute_layout(
        &inputs.template,
        &inputs.blocks,
        &FontManager::default(),
        &inputs.variables,
        &ExportConfig::default(),
    );
    write_json(document.to_json(), out_json_ptr)
}

/// Render a PDF from a paginated layout JSON string.
///
/// This allows computing the layout once and rendering it separately.
///
/// # Safety
/// `json_ptr` must be a valid null-terminated string; `out_buf` and
/// `out_len` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn pf_render_from_layout(
    json_ptr: *const c_char,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if json_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return PF_NULL_POINTER;
    }

    let json = match CStr::from_ptr(json_ptr).to_str() {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&format!("Invalid UTF-8 in JSON: {e}"));
            return PF_INVALID_UTF8;
        }
    };

    let document = match PaginatedDocument::from_json(json) {
        Ok(d) => d,
        Err(e) => {
            set_last_error(&format!("Invalid layout JSON: {e}"));
            return PF_INVALID_INPUT;
        }
    };

    let fonts = FontManager::default();
    let mut renderer = PdfRenderer::with_fonts(&document.title, fonts.clone());
    let rendered = render_document(&document, &mut renderer, &fonts, None)
        .and_then(|_| renderer.take_bytes().ok_or_else(|| "renderer produced no output".into()));
    match rendered {
        Ok(pdf_bytes) => {
            write_buffer(pdf_bytes, out_buf, out_len);
            PF_OK
        }
        Err(e) => {
            set_last_error(&e.to_string());
            PF_RENDER_FAILED
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `pf_generate_pdf`.
///
/// # Safety
/// `buf` must have been returned by a previous `pf_generate_pdf` (or similar)
/// call, and `len` must be the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn pf_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a layout JSON string.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn pf_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `pf_*` call on the same
/// thread. The caller should **not** free this pointer – it is managed
/// internally.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn pf_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn pf_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{invoice_blocks, invoice_template, invoice_variables, minimal_template};

    #[test]
    fn ffi_generate_pdf() {
        let template = minimal_template().as_bytes();
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            pf_generate_pdf(
                template.as_ptr(),
                template.len() as u32,
                ptr::null(),
                0,
                ptr::null(),
                0,
                &mut out_buf,
                &mut out_len,
            )
        };

        assert_eq!(rc, 0, "Expected success");
        assert!(!out_buf.is_null());
        assert!(out_len > 100);

        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");

        unsafe { pf_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_compute_layout_with_blocks_and_variables() {
        let template = invoice_template().as_bytes();
        let vars = invoice_variables().as_bytes();
        let blocks = invoice_blocks().as_bytes();
        let mut json_ptr: *mut c_char = ptr::null_mut();

        let rc = unsafe {
            pf_compute_layout(
                template.as_ptr(),
                template.len() as u32,
                vars.as_ptr(),
                vars.len() as u32,
                blocks.as_ptr(),
                blocks.len() as u32,
                &mut json_ptr,
            )
        };

        assert_eq!(rc, 0);
        assert!(!json_ptr.is_null());

        let json = unsafe { CStr::from_ptr(json_ptr) }.to_str().unwrap().to_string();
        assert!(json.contains("\"pages\""));
        assert!(json.contains("INVOICE 2024-001"));
        assert!(json.contains("Acme Corp"));

        unsafe { pf_free_string(json_ptr) };
    }

    #[test]
    fn ffi_layout_round_trips_into_pdf() {
        let template = minimal_template().as_bytes();
        let mut json_ptr: *mut c_char = ptr::null_mut();
        let rc = unsafe {
            pf_compute_layout(template.as_ptr(), template.len() as u32, ptr::null(), 0, ptr::null(), 0, &mut json_ptr)
        };
        assert_eq!(rc, 0);

        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe { pf_render_from_layout(json_ptr, &mut out_buf, &mut out_len) };
        assert_eq!(rc, 0);
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");

        unsafe {
            pf_free_buffer(out_buf, out_len);
            pf_free_string(json_ptr);
        }
    }

    #[test]
    fn ffi_null_input() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            pf_generate_pdf(ptr::null(), 0, ptr::null(), 0, ptr::null(), 0, &mut out_buf, &mut out_len)
        };

        assert_eq!(rc, PF_NULL_POINTER, "Should fail on null input");
        assert!(!pf_last_error().is_null());
    }

    #[test]
    fn ffi_invalid_template_sets_last_error() {
        let template = b"{\"pageSize\": 5}";
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            pf_generate_pdf(
                template.as_ptr(),
                template.len() as u32,
                ptr::null(),
                0,
                ptr::null(),
                0,
                &mut out_buf,
                &mut out_len,
            )
        };

        assert_eq!(rc, PF_INVALID_INPUT);
        let msg = unsafe { CStr::from_ptr(pf_last_error()) }.to_str().unwrap();
        assert!(msg.contains("JSON"), "{msg}");
    }

    #[test]
    fn ffi_version() {
        let v = pf_version();
        let version = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}

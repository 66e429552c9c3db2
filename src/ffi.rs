// C entry points: iterator constructors, next/free, in-place unescape, and
// the thread-local last-error slot for callers that cannot receive multiple
// return values from a constructor. The core itself stays well-typed; this
// module only translates.

#![allow(non_camel_case_types)]

use std::cell::Cell;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::fs::File;
use std::io;
use std::ptr;
use std::slice;

#[cfg(unix)]
use std::io::Read;
#[cfg(unix)]
use std::mem::ManuallyDrop;
#[cfg(unix)]
use std::os::unix::io::FromRawFd;

use crate::source::{ByteSource, CallbackSource, Fill, ReadOutcome, ReadSource, SliceSource};
use crate::{unescape_in_place, FieldIter, ParseError};

/// Error codes of the C surface. The numeric ordering is part of the ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum zcsv_error {
    ZCSV_OK = 0,
    ZCSV_ERR_OOM = 1,
    ZCSV_ERR_FIELD_TOO_LONG = 2,
    ZCSV_ERR_EOF = 3,
    ZCSV_ERR_INVALID_QUOTES = 4,
    ZCSV_ERR_READ_FAILED = 5,
    ZCSV_ERR_OPEN_ERROR = 6,
}

/// One parsed field. `data` points into the iterator's buffer, is not
/// NUL-terminated, and is valid only until the next `zcsv_iter_next` or
/// `zcsv_iter_free` on the same iterator.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct zcsv_field {
    pub data: *mut c_char,
    pub len: usize,
    pub last_column: c_int,
    pub needs_unescape: c_int,
}

/// Status of one callback read.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum zcsv_read_status {
    ZCSV_READ_STATUS_OK = 0,
    ZCSV_READ_STATUS_EOF = 1,
    ZCSV_READ_STATUS_ERROR = 2,
}

/// What a callback read produced.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct zcsv_read_result {
    pub bytes_read: usize,
    pub status: zcsv_read_status,
}

/// Read function supplied to `zcsv_iter_from_callback`. Fills `buffer` with
/// up to `len` bytes and reports the count and status.
pub type zcsv_read_fn =
    unsafe extern "C" fn(context: *mut c_void, buffer: *mut c_char, len: usize) -> zcsv_read_result;

thread_local! {
    static LAST_ERROR: Cell<zcsv_error> = const { Cell::new(zcsv_error::ZCSV_OK) };
}

fn set_err(code: zcsv_error) {
    LAST_ERROR.with(|slot| slot.set(code));
}

/// The error code of the most recent failed operation on this thread.
/// Primarily for constructor functions, which can only return NULL.
#[no_mangle]
pub extern "C" fn zcsv_err() -> zcsv_error {
    LAST_ERROR.with(|slot| slot.get())
}

#[cfg(unix)]
struct BorrowedFile(ManuallyDrop<File>);

#[cfg(unix)]
impl Read for BorrowedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut file: &File = &self.0;
        file.read(buf)
    }
}

type CallbackFn = Box<dyn FnMut(&mut [u8]) -> ReadOutcome>;

/// Runtime dispatch over the four source adapters.
enum FfiSource {
    File(ReadSource<'static, File>),
    #[cfg(unix)]
    Fd(ReadSource<'static, BorrowedFile>),
    Bytes(SliceSource<'static>),
    Callback(CallbackSource<'static, CallbackFn>),
}

macro_rules! each_source {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            FfiSource::File($s) => $body,
            #[cfg(unix)]
            FfiSource::Fd($s) => $body,
            FfiSource::Bytes($s) => $body,
            FfiSource::Callback($s) => $body,
        }
    };
}

impl ByteSource for FfiSource {
    fn buf(&self) -> &[u8] {
        each_source!(self, s => s.buf())
    }
    fn buf_mut(&mut self) -> &mut [u8] {
        each_source!(self, s => s.buf_mut())
    }
    fn seek(&self) -> usize {
        each_source!(self, s => s.seek())
    }
    fn end(&self) -> usize {
        each_source!(self, s => s.end())
    }
    fn toss(&mut self, n: usize) {
        each_source!(self, s => s.toss(n))
    }
    fn fill_more(&mut self) -> io::Result<Fill> {
        each_source!(self, s => s.fill_more())
    }
    fn probe(&mut self) -> io::Result<Fill> {
        each_source!(self, s => s.probe())
    }
}

/// Opaque iterator handle.
pub struct zcsv_iterator {
    inner: FieldIter<FfiSource>,
}

fn into_handle(src: FfiSource) -> *mut zcsv_iterator {
    set_err(zcsv_error::ZCSV_OK);
    Box::into_raw(Box::new(zcsv_iterator {
        inner: FieldIter::new(src),
    }))
}

/// Open `filename` and iterate its fields through the caller's buffer.
/// The file is owned by the iterator and closed by `zcsv_iter_free`.
///
/// # Safety
///
/// `filename` must be a valid NUL-terminated string. `buffer` must point to
/// `len` writable bytes that outlive the iterator and are touched by
/// nothing else while it lives.
#[no_mangle]
pub unsafe extern "C" fn zcsv_iter_from_file(
    filename: *const c_char,
    buffer: *mut c_char,
    len: usize,
) -> *mut zcsv_iterator {
    if filename.is_null() || buffer.is_null() {
        set_err(zcsv_error::ZCSV_ERR_OPEN_ERROR);
        return ptr::null_mut();
    }
    let Ok(path) = CStr::from_ptr(filename).to_str() else {
        set_err(zcsv_error::ZCSV_ERR_OPEN_ERROR);
        return ptr::null_mut();
    };
    let buf = slice::from_raw_parts_mut(buffer.cast::<u8>(), len);
    match ReadSource::open(path, buf) {
        Ok(src) => into_handle(FfiSource::File(src)),
        Err(_) => {
            set_err(zcsv_error::ZCSV_ERR_OPEN_ERROR);
            ptr::null_mut()
        }
    }
}

/// Iterate fields read from an already-open descriptor. The descriptor is
/// borrowed: the caller keeps it open for the iterator's lifetime and
/// closes it afterwards.
///
/// # Safety
///
/// `fd` must be a readable open file descriptor. `buffer` as for
/// `zcsv_iter_from_file`.
#[cfg(unix)]
#[no_mangle]
pub unsafe extern "C" fn zcsv_iter_from_fd(
    fd: c_int,
    buffer: *mut c_char,
    len: usize,
) -> *mut zcsv_iterator {
    if fd < 0 || buffer.is_null() {
        set_err(zcsv_error::ZCSV_ERR_OPEN_ERROR);
        return ptr::null_mut();
    }
    let file = BorrowedFile(ManuallyDrop::new(File::from_raw_fd(fd)));
    let buf = slice::from_raw_parts_mut(buffer.cast::<u8>(), len);
    into_handle(FfiSource::Fd(ReadSource::new(file, buf)))
}

/// Iterate fields of an in-memory byte array, zero-copy. No internal buffer
/// exists; `zcsv_unescape_in_place` on a yielded field mutates `data`.
///
/// # Safety
///
/// `data` must point to `len` writable bytes that outlive the iterator.
#[no_mangle]
pub unsafe extern "C" fn zcsv_iter_from_bytes(data: *mut c_char, len: usize) -> *mut zcsv_iterator {
    if data.is_null() {
        set_err(zcsv_error::ZCSV_ERR_OPEN_ERROR);
        return ptr::null_mut();
    }
    let buf = slice::from_raw_parts_mut(data.cast::<u8>(), len);
    into_handle(FfiSource::Bytes(SliceSource::new(buf)))
}

/// Iterate fields pulled through `read`, which is invoked with `context`
/// whenever the parser needs more data.
///
/// # Safety
///
/// `read` must be callable with `context` for the iterator's lifetime and
/// must honour the `zcsv_read_result` contract. `buffer` as for
/// `zcsv_iter_from_file`.
#[no_mangle]
pub unsafe extern "C" fn zcsv_iter_from_callback(
    context: *mut c_void,
    read: Option<zcsv_read_fn>,
    buffer: *mut c_char,
    len: usize,
) -> *mut zcsv_iterator {
    let Some(read) = read else {
        set_err(zcsv_error::ZCSV_ERR_OPEN_ERROR);
        return ptr::null_mut();
    };
    if buffer.is_null() {
        set_err(zcsv_error::ZCSV_ERR_OPEN_ERROR);
        return ptr::null_mut();
    }
    let buf = slice::from_raw_parts_mut(buffer.cast::<u8>(), len);
    let pull = make_pull(read, context as usize);
    into_handle(FfiSource::Callback(CallbackSource::new(pull, buf)))
}

/// Wrap a C read function as a pull closure for [`CallbackSource`].
fn make_pull(read: zcsv_read_fn, context: usize) -> CallbackFn {
    Box::new(move |dst: &mut [u8]| {
        let result = unsafe {
            read(
                context as *mut c_void,
                dst.as_mut_ptr().cast::<c_char>(),
                dst.len(),
            )
        };
        match result.status {
            zcsv_read_status::ZCSV_READ_STATUS_OK => ReadOutcome::Read(result.bytes_read),
            zcsv_read_status::ZCSV_READ_STATUS_EOF => ReadOutcome::Eof,
            zcsv_read_status::ZCSV_READ_STATUS_ERROR => ReadOutcome::Error,
        }
    })
}

fn code_of(err: &ParseError) -> zcsv_error {
    match err {
        ParseError::EndOfInput => zcsv_error::ZCSV_ERR_EOF,
        ParseError::FieldTooLong => zcsv_error::ZCSV_ERR_FIELD_TOO_LONG,
        ParseError::InvalidQuotes => zcsv_error::ZCSV_ERR_INVALID_QUOTES,
        ParseError::ReadFailed(_) => zcsv_error::ZCSV_ERR_READ_FAILED,
    }
}

/// Parse the next field into `field`. Returns `ZCSV_OK`, `ZCSV_ERR_EOF` at
/// the end of input, or a fatal error code.
///
/// # Safety
///
/// `iter` must come from a `zcsv_iter_from_*` constructor and not have been
/// freed; `field` must be writable.
#[no_mangle]
pub unsafe extern "C" fn zcsv_iter_next(
    iter: *mut zcsv_iterator,
    field: *mut zcsv_field,
) -> zcsv_error {
    if iter.is_null() || field.is_null() {
        set_err(zcsv_error::ZCSV_ERR_READ_FAILED);
        return zcsv_error::ZCSV_ERR_READ_FAILED;
    }
    match (*iter).inner.next_field() {
        Ok(mut parsed) => {
            let (data, len) = {
                let bytes = parsed.data_mut();
                (bytes.as_mut_ptr().cast::<c_char>(), bytes.len())
            };
            *field = zcsv_field {
                data,
                len,
                last_column: c_int::from(parsed.last_column()),
                needs_unescape: c_int::from(parsed.needs_unescape()),
            };
            zcsv_error::ZCSV_OK
        }
        Err(err) => {
            let code = code_of(&err);
            set_err(code);
            code
        }
    }
}

/// Collapse doubled quotes in `data` in place; returns the new length
/// (never longer). Call when a yielded field has `needs_unescape` set.
///
/// # Safety
///
/// `data` must point to `len` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn zcsv_unescape_in_place(data: *mut c_char, len: usize) -> usize {
    if data.is_null() {
        return 0;
    }
    let bytes = slice::from_raw_parts_mut(data.cast::<u8>(), len);
    unescape_in_place(bytes, b'"')
}

/// Free an iterator and release its resources. Closes the file for
/// iterators built by `zcsv_iter_from_file`. NULL is a no-op.
///
/// # Safety
///
/// `iter` must come from a `zcsv_iter_from_*` constructor and must not be
/// used afterwards.
#[no_mangle]
pub unsafe extern "C" fn zcsv_iter_free(iter: *mut zcsv_iterator) {
    if !iter.is_null() {
        drop(Box::from_raw(iter));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(field: &zcsv_field) -> Vec<u8> {
        unsafe { slice::from_raw_parts(field.data.cast::<u8>(), field.len).to_vec() }
    }

    #[test]
    fn bytes_iterator_full_pass() {
        let mut data = b"a,\"b\"\"c\"\nd".to_vec();
        let it = unsafe { zcsv_iter_from_bytes(data.as_mut_ptr().cast::<c_char>(), data.len()) };
        assert!(!it.is_null());
        let mut field = zcsv_field {
            data: ptr::null_mut(),
            len: 0,
            last_column: 0,
            needs_unescape: 0,
        };
        unsafe {
            assert_eq!(zcsv_iter_next(it, &mut field), zcsv_error::ZCSV_OK);
            assert_eq!(take(&field), b"a");
            assert_eq!(field.last_column, 0);

            assert_eq!(zcsv_iter_next(it, &mut field), zcsv_error::ZCSV_OK);
            assert_eq!(take(&field), b"b\"\"c");
            assert_eq!(field.needs_unescape, 1);
            assert_eq!(field.last_column, 1);
            field.len = zcsv_unescape_in_place(field.data, field.len);
            assert_eq!(take(&field), b"b\"c");

            assert_eq!(zcsv_iter_next(it, &mut field), zcsv_error::ZCSV_OK);
            assert_eq!(take(&field), b"d");
            assert_eq!(field.last_column, 1);

            assert_eq!(zcsv_iter_next(it, &mut field), zcsv_error::ZCSV_ERR_EOF);
            assert_eq!(zcsv_err(), zcsv_error::ZCSV_ERR_EOF);
            zcsv_iter_free(it);
        }
    }

    struct Ctx {
        data: Vec<u8>,
        pos: usize,
    }

    unsafe extern "C" fn trickle_read(
        context: *mut c_void,
        buffer: *mut c_char,
        len: usize,
    ) -> zcsv_read_result {
        let ctx = &mut *(context as *mut Ctx);
        let n = (ctx.data.len() - ctx.pos).min(len).min(2);
        if n == 0 {
            return zcsv_read_result {
                bytes_read: 0,
                status: zcsv_read_status::ZCSV_READ_STATUS_EOF,
            };
        }
        ptr::copy_nonoverlapping(ctx.data.as_ptr().add(ctx.pos), buffer.cast::<u8>(), n);
        ctx.pos += n;
        zcsv_read_result {
            bytes_read: n,
            status: zcsv_read_status::ZCSV_READ_STATUS_OK,
        }
    }

    #[test]
    fn callback_iterator_trickles() {
        let mut ctx = Ctx {
            data: b"one,two\nthree".to_vec(),
            pos: 0,
        };
        let mut buf = [0u8; 32];
        let it = unsafe {
            zcsv_iter_from_callback(
                (&mut ctx as *mut Ctx).cast::<c_void>(),
                Some(trickle_read),
                buf.as_mut_ptr().cast::<c_char>(),
                buf.len(),
            )
        };
        assert!(!it.is_null());
        let mut field = zcsv_field {
            data: ptr::null_mut(),
            len: 0,
            last_column: 0,
            needs_unescape: 0,
        };
        unsafe {
            assert_eq!(zcsv_iter_next(it, &mut field), zcsv_error::ZCSV_OK);
            assert_eq!(take(&field), b"one");
            assert_eq!(zcsv_iter_next(it, &mut field), zcsv_error::ZCSV_OK);
            assert_eq!(take(&field), b"two");
            assert_eq!(field.last_column, 1);
            assert_eq!(zcsv_iter_next(it, &mut field), zcsv_error::ZCSV_OK);
            assert_eq!(take(&field), b"three");
            assert_eq!(field.last_column, 1);
            assert_eq!(zcsv_iter_next(it, &mut field), zcsv_error::ZCSV_ERR_EOF);
            zcsv_iter_free(it);
        }
    }

    #[test]
    fn missing_file_sets_error_slot() {
        let mut buf = [0u8; 16];
        let name = b"definitely/not/here.csv\0";
        let it = unsafe {
            zcsv_iter_from_file(
                name.as_ptr().cast::<c_char>(),
                buf.as_mut_ptr().cast::<c_char>(),
                buf.len(),
            )
        };
        assert!(it.is_null());
        assert_eq!(zcsv_err(), zcsv_error::ZCSV_ERR_OPEN_ERROR);
    }

    #[test]
    fn invalid_quotes_code() {
        let mut data = b"ab\"cd\n".to_vec();
        let it = unsafe { zcsv_iter_from_bytes(data.as_mut_ptr().cast::<c_char>(), data.len()) };
        let mut field = zcsv_field {
            data: ptr::null_mut(),
            len: 0,
            last_column: 0,
            needs_unescape: 0,
        };
        unsafe {
            assert_eq!(
                zcsv_iter_next(it, &mut field),
                zcsv_error::ZCSV_ERR_INVALID_QUOTES
            );
            zcsv_iter_free(it);
        }
    }
}

//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Mailsandbox.
//
// Mailsandbox is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailsandbox is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Mailsandbox. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use super::error::{Error, StoreError};

/// Atomically replace `path` with `data`.
///
/// The data is written to a temporary file in the same directory, synced,
/// then renamed over the destination, so readers only ever see the old or
/// the new content.
pub fn spit(path: impl AsRef<Path>, data: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tf = tempfile::NamedTempFile::new_in(dir)?;
    tf.as_file_mut().write_all(data)?;
    tf.as_file_mut().sync_all()?;
    tf.persist(path)?;
    Ok(())
}

/// Read the whole file, returning `None` if it does not exist.
pub fn slurp_opt(path: impl AsRef<Path>) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if io::ErrorKind::NotFound == e.kind() => Ok(None),
        Err(e) => Err(e),
    }
}

pub trait ReadUninterruptibly: Read {
    fn read_uninterruptibly(&mut self, dst: &mut [u8]) -> io::Result<usize>;
}

impl<R: Read + ?Sized> ReadUninterruptibly for R {
    /// Read bytes into `dst` until `dst` is full or EOF is reached.
    ///
    /// `Interrupted` errors are ignored and retried. Other errors are
    /// propagated.
    fn read_uninterruptibly(
        &mut self,
        mut dst: &mut [u8],
    ) -> io::Result<usize> {
        let mut total = 0;
        while !dst.is_empty() {
            match self.read(dst) {
                Ok(0) => break,
                Ok(n) => {
                    total += n;
                    dst = &mut dst[n..];
                }
                Err(e) if io::ErrorKind::Interrupted == e.kind() => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(total)
    }
}

pub trait IgnoreKinds {
    fn ignore_already_exists(self) -> Self;
    fn ignore_not_found(self) -> Self;
}

impl<R: Default> IgnoreKinds for Result<R, io::Error> {
    fn ignore_already_exists(self) -> Self {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::AlreadyExists == e.kind() => {
                Ok(R::default())
            }
            Err(e) => Err(e),
        }
    }

    fn ignore_not_found(self) -> Self {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::NotFound == e.kind() => Ok(R::default()),
            Err(e) => Err(e),
        }
    }
}

pub trait ErrorTransforms {
    type Coerced;
    fn on_exists(self, error: impl Into<Error>) -> Self::Coerced;
    fn on_not_found(self, error: impl Into<Error>) -> Self::Coerced;
}

impl<R> ErrorTransforms for Result<R, io::Error> {
    type Coerced = Result<R, Error>;

    fn on_exists(self, error: impl Into<Error>) -> Result<R, Error> {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::AlreadyExists == e.kind() => {
                Err(error.into())
            }
            Err(e) => Err(Error::Store(StoreError::Io(e))),
        }
    }

    fn on_not_found(self, error: impl Into<Error>) -> Result<R, Error> {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                Err(error.into())
            }
            Err(e) => Err(Error::Store(StoreError::Io(e))),
        }
    }
}

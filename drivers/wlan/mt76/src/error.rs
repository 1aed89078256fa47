// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {log::error, std::fmt, thiserror::Error};

/// Raw status code handed back to the host stack. Negative values follow errno numbering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Status(i32);

impl Status {
    pub const OK: Self = Self(0);
    pub const NOT_FOUND: Self = Self(-2);
    pub const IO: Self = Self(-5);
    pub const BUSY: Self = Self(-16);
    pub const INVALID_ARGS: Self = Self(-22);
    pub const NO_SPACE: Self = Self(-28);
    pub const NOT_SUPPORTED: Self = Self(-95);

    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub fn into_raw(self) -> i32 {
        self.0
    }

    /// Turns a raw hardware return code into a `Result`.
    pub fn ok(raw: i32) -> Result<(), Status> {
        if raw == 0 {
            Ok(())
        } else {
            Err(Self(raw))
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::OK => "OK",
            Self::NOT_FOUND => "NOT_FOUND",
            Self::IO => "IO",
            Self::BUSY => "BUSY",
            Self::INVALID_ARGS => "INVALID_ARGS",
            Self::NO_SPACE => "NO_SPACE",
            Self::NOT_SUPPORTED => "NOT_SUPPORTED",
            Self(raw) => return write!(f, "status {}", raw),
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no free peer slot")]
    NoSlot,
    #[error("slot {0} is already in use")]
    SlotInUse(u8),
    #[error("interface index {0} is already in use")]
    IfaceIndexInUse(u8),
    #[error("unknown interface")]
    UnknownInterface,
    #[error("unknown peer")]
    UnknownPeer,
    #[error("invalid argument: {0}")]
    InvalidArgs(&'static str),
    #[error("unsupported cipher suite {0:#010x}")]
    UnsupportedCipher(u32),
    #[error("{0}; {1}")]
    Hardware(String, Status),
}

impl From<Error> for Status {
    fn from(e: Error) -> Self {
        match e {
            Error::NoSlot => Status::NO_SPACE,
            Error::SlotInUse(_) | Error::IfaceIndexInUse(_) => Status::BUSY,
            Error::UnknownInterface | Error::UnknownPeer => Status::NOT_FOUND,
            Error::InvalidArgs(_) => Status::INVALID_ARGS,
            Error::UnsupportedCipher(_) => Status::NOT_SUPPORTED,
            Error::Hardware(_, status) => status,
        }
    }
}

pub trait ResultExt {
    /// Returns 0 if Self is Ok, otherwise logs the error and turns Self into the matching negative
    /// status code.
    fn into_raw_status(self) -> i32;
}

impl ResultExt for Result<(), Error> {
    fn into_raw_status(self) -> i32 {
        match self {
            Ok(()) | Err(Error::Hardware(_, Status::OK)) => Status::OK.into_raw(),
            Err(e) => {
                error!("{}", e);
                Status::from(e).into_raw()
            }
        }
    }
}

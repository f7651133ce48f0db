//! Single-byte response tags and their payloads (spec §4.1, §4.2, §6).

use std::io;

/// Response to a `WriteFile` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteFileResponse {
    /// Send the file as a plain (optionally compressed) copy.
    Copy,
    /// Send uncompressed via the share's own SMB path (external + uncompressed).
    CopyUsingSmb,
    /// Send as a delta against a near-match reference.
    CopyDelta,
    /// The server hard-linked an existing copy; no bytes follow.
    Link,
    /// The server performed an offloaded (ODX) server-local copy.
    Odx,
    /// The destination already matches; no bytes follow.
    Skip,
    /// The server needs the client's content hash before deciding.
    Hash,
    /// The session has no valid environment bound yet.
    BadDestination,
}

/// Response to a `ReadFile` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadFileResponse {
    /// Server will stream the file as a plain (optionally compressed) copy.
    Copy,
    /// Server will stream uncompressed via the share's own SMB path.
    CopyUsingSmb,
    /// Server will stream a delta against a near-match reference.
    CopyDelta,
    /// Destination already matches; nothing to send.
    Skip,
    /// Admission control rejected the request; retry later.
    ServerBusy,
    /// The session has no valid environment bound yet.
    BadSource,
    /// The server needs the client's content hash to confirm equality.
    Hash,
}

/// Response to a `DeleteFiles` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteFilesResponse {
    /// The deletion succeeded.
    Success,
    /// The deletion failed.
    Error,
    /// The session has no valid environment bound yet.
    BadDestination,
}

/// Response to a `CreateDir` request. Wire values 0 and 1 are the
/// `BadDestination`/`Error` tags; values 2 and above encode
/// `SuccessExisted` plus the number of directory levels freshly created
/// (capped at 200, i.e. wire values 2..=202).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateDirResponse {
    /// The session has no valid environment bound yet.
    BadDestination,
    /// The directory could not be created.
    Error,
    /// The directory exists (now or already); `created` counts the levels
    /// freshly created by this call.
    SuccessExisted {
        /// Number of directory levels freshly created, capped at 200.
        created: u32,
    },
}

/// Cap on the `created` count a `CreateDirResponse::SuccessExisted` can
/// report (spec §4.2: "capped at 200").
pub const MAX_CREATED_DIR_LEVELS: u32 = 200;

macro_rules! byte_enum {
    ($name:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        impl $name {
            /// Encodes this response as its single wire byte.
            #[must_use]
            pub const fn to_byte(self) -> u8 {
                match self {
                    $(Self::$variant => $value,)+
                }
            }

            /// Decodes a single wire byte into a response.
            pub fn from_byte(byte: u8) -> io::Result<Self> {
                match byte {
                    $($value => Ok(Self::$variant),)+
                    other => Err(io::Error::other(format!(
                        concat!("unexpected ", stringify!($name), " tag {}"),
                        other
                    ))),
                }
            }
        }
    };
}

byte_enum!(WriteFileResponse {
    Copy = 0,
    CopyUsingSmb = 1,
    CopyDelta = 2,
    Link = 3,
    Odx = 4,
    Skip = 5,
    Hash = 6,
    BadDestination = 7,
});

byte_enum!(ReadFileResponse {
    Copy = 0,
    CopyUsingSmb = 1,
    CopyDelta = 2,
    Skip = 3,
    ServerBusy = 4,
    BadSource = 5,
    Hash = 6,
});

byte_enum!(DeleteFilesResponse {
    Success = 0,
    Error = 1,
    BadDestination = 2,
});

impl CreateDirResponse {
    /// Encodes this response as its single wire byte.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::BadDestination => 0,
            Self::Error => 1,
            Self::SuccessExisted { created } => {
                2 + created.min(MAX_CREATED_DIR_LEVELS) as u8
            }
        }
    }

    /// Decodes a single wire byte into a response.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Self::BadDestination,
            1 => Self::Error,
            n => Self::SuccessExisted {
                created: u32::from(n - 2),
            },
        }
    }
}

/// Trailing outcome byte the server writes after consuming a `WriteFile`'s
/// body: `1` on success, `0` if the destination-side write failed after the
/// server already committed to a non-terminal response (spec §7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrailingSuccess(pub bool);

impl TrailingSuccess {
    /// Encodes the trailing byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        u8::from(self.0)
    }

    /// Decodes the trailing byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte != 0)
    }
}

/// Footer accompanying the server's handling of `Done`: the sum of
/// compression levels used across the session's transfers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DoneFooter {
    /// Sum of per-file compression levels applied this session.
    pub compression_level_sum: u32,
}

impl DoneFooter {
    /// Encodes the footer as 4 little-endian bytes.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.compression_level_sum.to_le_bytes()
    }

    /// Decodes the footer from 4 little-endian bytes.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let arr: [u8; 4] = bytes
            .try_into()
            .map_err(|_| io::Error::other("DoneFooter must be 4 bytes"))?;
        Ok(Self {
            compression_level_sum: u32::from_le_bytes(arr),
        })
    }
}

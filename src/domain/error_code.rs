use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Error codes shared with the scripting layer.
///
/// The integer values are part of the wire contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,

    NetworkError = 2000,
    ServerError = 2001,
    NotImplemented = 2002,
    LogicError = 2003,
    InternalError = 2004,
    Canceled = 2005,
    AlreadyInProgress = 2006,

    NotSetup = 2100,
    BadAppCredentials = 2101,
    NotLoggedIn = 2102,
    BadParameters = 2104,
    EventListenerAlreadyRegistered = 2105,
    AlreadySetup = 2106,
    SocialNetworkError = 2107,
    LoginCanceled = 2108,
    ErrorWithExternalStore = 2109,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 17] = [
        ErrorCode::Ok,
        ErrorCode::NetworkError,
        ErrorCode::ServerError,
        ErrorCode::NotImplemented,
        ErrorCode::LogicError,
        ErrorCode::InternalError,
        ErrorCode::Canceled,
        ErrorCode::AlreadyInProgress,
        ErrorCode::NotSetup,
        ErrorCode::BadAppCredentials,
        ErrorCode::NotLoggedIn,
        ErrorCode::BadParameters,
        ErrorCode::EventListenerAlreadyRegistered,
        ErrorCode::AlreadySetup,
        ErrorCode::SocialNetworkError,
        ErrorCode::LoginCanceled,
        ErrorCode::ErrorWithExternalStore,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = i32::deserialize(deserializer)?;
        ErrorCode::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown error code {code}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_bit_exact() {
        assert_eq!(ErrorCode::Ok.code(), 0);
        assert_eq!(ErrorCode::InternalError.code(), 2004);
        assert_eq!(ErrorCode::Canceled.code(), 2005);
        assert_eq!(ErrorCode::AlreadyInProgress.code(), 2006);
        assert_eq!(ErrorCode::BadParameters.code(), 2104);
        assert_eq!(ErrorCode::ErrorWithExternalStore.code(), 2109);
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&ErrorCode::Canceled).unwrap();
        assert_eq!(json, "2005");

        let code: ErrorCode = serde_json::from_str("2109").unwrap();
        assert_eq!(code, ErrorCode::ErrorWithExternalStore);
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        // 2103 is a hole in the table
        assert!(ErrorCode::from_code(2103).is_none());
        assert!(serde_json::from_str::<ErrorCode>("2103").is_err());
    }
}

/// SCORM 1.2 API error codes, as returned by `LMSGetLastError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScormErrorCode {
    #[default]
    NoError,
    GeneralException,
    InvalidArgument,
    ElementCannotHaveChildren,
    ElementNotAnArray,
    NotInitialized,
    NotImplemented,
    InvalidSetValue,
    ReadOnly,
    WriteOnly,
    IncorrectDataType,
}

impl ScormErrorCode {
    pub const ALL: [ScormErrorCode; 11] = [
        Self::NoError,
        Self::GeneralException,
        Self::InvalidArgument,
        Self::ElementCannotHaveChildren,
        Self::ElementNotAnArray,
        Self::NotInitialized,
        Self::NotImplemented,
        Self::InvalidSetValue,
        Self::ReadOnly,
        Self::WriteOnly,
        Self::IncorrectDataType,
    ];

    pub fn code(self) -> u16 {
        match self {
            Self::NoError => 0,
            Self::GeneralException => 101,
            Self::InvalidArgument => 201,
            Self::ElementCannotHaveChildren => 202,
            Self::ElementNotAnArray => 203,
            Self::NotInitialized => 301,
            Self::NotImplemented => 401,
            Self::InvalidSetValue => 402,
            Self::ReadOnly => 403,
            Self::WriteOnly => 404,
            Self::IncorrectDataType => 405,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.code() == code)
    }

    /// The standard `LMSGetErrorString` text.
    pub fn message(self) -> &'static str {
        match self {
            Self::NoError => "No error",
            Self::GeneralException => "General exception",
            Self::InvalidArgument => "Invalid argument error",
            Self::ElementCannotHaveChildren => "Element cannot have children",
            Self::ElementNotAnArray => "Element not an array. Cannot have count.",
            Self::NotInitialized => "Not initialized",
            Self::NotImplemented => "Not implemented error",
            Self::InvalidSetValue => "Invalid set value, element is a keyword",
            Self::ReadOnly => "Element is read only.",
            Self::WriteOnly => "Element is write only",
            Self::IncorrectDataType => "Incorrect Data Type",
        }
    }
}

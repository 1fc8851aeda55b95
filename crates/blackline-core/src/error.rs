use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid OOXML package: {message}")]
    InvalidPackage { message: String },

    #[error("missing required part '{part_path}'")]
    MissingPart { part_path: String },

    #[error("XML parse error at {location}: {message}")]
    XmlParse { message: String, location: String },

    #[error("XML write error: {0}")]
    XmlWrite(String),

    #[error("stale node reference")]
    InvalidRef,

    #[error("unsupported feature: {feature}")]
    UnsupportedFeature { feature: String },

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_part_names_the_part() {
        let err = Error::MissingPart {
            part_path: "word/document.xml".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "missing required part 'word/document.xml'"
        );
    }

    #[test]
    fn unsupported_feature_names_the_feature() {
        let err = Error::UnsupportedFeature {
            feature: "nested altChunk".to_string(),
        };
        assert!(err.to_string().contains("nested altChunk"));
    }
}

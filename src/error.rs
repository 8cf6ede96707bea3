use std::fmt::Display;

#[derive(Debug)]
pub enum StressmapError {
    Input(String),
    Geometry(String),
    Results(String),
    PostProcessor(String),
}

impl Display for StressmapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (err_name, value) = match self {
            StressmapError::Input(v) => ("Input", v),
            StressmapError::Geometry(v) => ("Geometry", v),
            StressmapError::Results(v) => ("Results", v),
            StressmapError::PostProcessor(v) => ("Post Processor", v),
        };

        write!(f, "{} error: {}", err_name, value)
    }
}

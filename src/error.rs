use thiserror::Error;

/// Reasons a site has no LUT mapping under the greedy pin assignment.
///
/// These are ordinary outcomes; the caller is expected to try another
/// placement rather than report them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("{nets} distinct nets enter the site but it only has {pins} input pins")]
    TooManyNets { nets: usize, pins: usize },

    #[error("net landed on pin {net_index} but may only use pins {min_pin} to {max_pin}")]
    PinOutOfRange {
        net_index: usize,
        min_pin: usize,
        max_pin: usize,
    },

    #[error("equation of cell {cell} conflicts with the shared site equation")]
    EquationConflict { cell: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitParseError {
    #[error("malformed INIT literal {0:?}")]
    Malformed(String),

    #[error("INIT width {0} is not a supported power of two")]
    Width(usize),

    #[error("INIT literal {0:?} does not fit in its width")]
    Overflow(String),
}

#[derive(Debug, Error)]
pub enum DescError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: {source}")]
    Init {
        line: usize,
        #[source]
        source: InitParseError,
    },

    #[error("site description has no element line")]
    NoElement,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

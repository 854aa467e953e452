use snafu::{Location, Snafu};

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum ParseError {
    #[snafu(display("invalid size {input:?}: {reason}"))]
    InvalidSize {
        input:    String,
        reason:   String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("invalid duration {input:?}: {reason}"))]
    InvalidDuration {
        input:    String,
        reason:   String,
        #[snafu(implicit)]
        location: Location,
    },
}

//! Command opcodes of the integer wire protocol.

use crate::error::ProtocolError;

/// Command id: the first integer of every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    /// Move with the laser off: `x, y`.
    Move,
    /// Move with the laser on: `x, y`.
    Line,
    /// Move the auxiliary axis only: `z`.
    MoveZ,
    /// Redefine the absolute position: `x, y, z`.
    SetPosition,
    /// No operation.
    NoOp,
    /// Set a parameter: `index, value`.
    SetParameter,
    /// Upload a bitmap: `bpp, width`, then the packed data words.
    Bitmap,
}

impl Opcode {
    /// Fixed parameter count. For [`Opcode::Bitmap`] this is the header only.
    pub const fn param_count(self) -> usize {
        match self {
            Opcode::Move | Opcode::Line => 2,
            Opcode::MoveZ => 1,
            Opcode::SetPosition => 3,
            Opcode::NoOp => 0,
            Opcode::SetParameter => 2,
            Opcode::Bitmap => 2,
        }
    }

    /// Wire value of this opcode.
    pub const fn code(self) -> i32 {
        match self {
            Opcode::Move => 0,
            Opcode::Line => 1,
            Opcode::MoveZ => 2,
            Opcode::SetPosition => 4,
            Opcode::NoOp => 5,
            Opcode::SetParameter => 7,
            Opcode::Bitmap => 9,
        }
    }
}

impl TryFrom<i32> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Move),
            1 => Ok(Opcode::Line),
            2 => Ok(Opcode::MoveZ),
            4 => Ok(Opcode::SetPosition),
            5 => Ok(Opcode::NoOp),
            7 => Ok(Opcode::SetParameter),
            9 => Ok(Opcode::Bitmap),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}

/// Parameter index carried by [`Opcode::SetParameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parameter {
    /// Rescale the laser line feed, in basis points of the configured feed.
    LaserSpeed,
    /// Power of subsequent laser lines, 0-10000.
    LaserPower,
    /// Index this firmware does not interpret.
    Unknown(i32),
}

impl From<i32> for Parameter {
    fn from(index: i32) -> Self {
        match index {
            100 => Parameter::LaserSpeed,
            101 => Parameter::LaserPower,
            other => Parameter::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_round_trip() {
        for op in [
            Opcode::Move,
            Opcode::Line,
            Opcode::MoveZ,
            Opcode::SetPosition,
            Opcode::NoOp,
            Opcode::SetParameter,
            Opcode::Bitmap,
        ] {
            assert_eq!(Opcode::try_from(op.code()), Ok(op));
        }
    }

    #[test]
    fn test_unassigned_codes_rejected() {
        for code in [3, 6, 8, 10, -1, i32::MAX] {
            assert_eq!(Opcode::try_from(code), Err(ProtocolError::UnknownOpcode(code)));
        }
    }
}

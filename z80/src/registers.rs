use std::fmt;

/// Number of 16-bit values in a register report, in wire order.
pub const REGISTER_COUNT: usize = 12;

/// Register pairs as the debug stub reports them. The wire order is fixed:
/// `AF BC DE HL IX IY AF' BC' DE' HL' SP PC`, so `PC` sits at index 11.
#[derive(PartialEq, Copy, Clone, Debug)]
pub enum Reg16 {
    AF,
    BC,
    DE,
    HL,
    IX,
    IY,
    AFShadow,
    BCShadow,
    DEShadow,
    HLShadow,
    SP,
    PC,
}

impl Reg16 {
    pub const ALL: [Reg16; REGISTER_COUNT] = [
        Reg16::AF,
        Reg16::BC,
        Reg16::DE,
        Reg16::HL,
        Reg16::IX,
        Reg16::IY,
        Reg16::AFShadow,
        Reg16::BCShadow,
        Reg16::DEShadow,
        Reg16::HLShadow,
        Reg16::SP,
        Reg16::PC,
    ];

    pub fn index(self) -> usize {
        match self {
            Reg16::AF => 0,
            Reg16::BC => 1,
            Reg16::DE => 2,
            Reg16::HL => 3,
            Reg16::IX => 4,
            Reg16::IY => 5,
            Reg16::AFShadow => 6,
            Reg16::BCShadow => 7,
            Reg16::DEShadow => 8,
            Reg16::HLShadow => 9,
            Reg16::SP => 10,
            Reg16::PC => 11,
        }
    }
}

impl fmt::Display for Reg16 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Reg16::AF => write!(f, "AF"),
            Reg16::BC => write!(f, "BC"),
            Reg16::DE => write!(f, "DE"),
            Reg16::HL => write!(f, "HL"),
            Reg16::IX => write!(f, "IX"),
            Reg16::IY => write!(f, "IY"),
            Reg16::AFShadow => write!(f, "AF'"),
            Reg16::BCShadow => write!(f, "BC'"),
            Reg16::DEShadow => write!(f, "DE'"),
            Reg16::HLShadow => write!(f, "HL'"),
            Reg16::SP => write!(f, "SP"),
            Reg16::PC => write!(f, "PC"),
        }
    }
}

use std::collections::HashMap;
use std::ops::Range;

/// Column window holding the address field in assembler listing output.
const ADDRESS_COLUMNS: Range<usize> = 3..7;

/// How a listing line should be presented.
#[derive(PartialEq, Copy, Clone, Debug)]
pub enum LineClass {
    /// The program counter is on this line.
    CurrentPc,
    /// A breakpoint is set on this line's address.
    Breakpoint,
    Plain,
}

/// Bidirectional mapping between listing lines and target addresses. Built
/// in one pass over the listing text and read-only afterwards; reloading a
/// listing replaces the whole map.
pub struct ListingMap {
    line_to_address: HashMap<usize, u16>,
    address_to_line: HashMap<u16, usize>,
}

impl ListingMap {
    pub fn empty() -> ListingMap {
        ListingMap {
            line_to_address: HashMap::new(),
            address_to_line: HashMap::new(),
        }
    }

    /// A line maps to at most one address. When two lines carry the same
    /// address (macro expansions do this), the later line wins.
    pub fn build(listing: &str) -> ListingMap {
        let mut map = ListingMap::empty();
        for (index, line) in listing.lines().enumerate() {
            if let Some(address) = parse_address_field(line) {
                map.line_to_address.insert(index, address);
                map.address_to_line.insert(address, index);
            }
        }
        map
    }

    pub fn address_of_line(&self, line: usize) -> Option<u16> {
        self.line_to_address.get(&line).copied()
    }

    pub fn line_of_address(&self, address: u16) -> Option<usize> {
        self.address_to_line.get(&address).copied()
    }
}

fn parse_address_field(line: &str) -> Option<u16> {
    let field = line.get(ADDRESS_COLUMNS)?;
    if !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(field, 16).ok()
}

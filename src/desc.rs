// text description of a site and the cells placed in it
use crate::element::{LutBel, LutElement, MAX_SITE_PINS};
use crate::equation::LutEquation;
use crate::error::DescError;
use crate::mapper::LutCell;
use prjunnamed_netlist::{Design, Net};
use regex::Regex;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

pub struct SiteDescription {
    /// Owns the nets the cells refer to.
    pub design: Design,
    pub element: LutElement,
    pub cells: Vec<LutCell>,
    pub nets: BTreeMap<String, Net>,
}

impl SiteDescription {
    pub fn net_name(&self, net: Net) -> Option<&str> {
        self.nets
            .iter()
            .find(|(_, other)| **other == net)
            .map(|(name, _)| name.as_str())
    }
}

struct PendingCell {
    line: usize,
    name: String,
    bel: String,
    equation: LutEquation,
    inputs: Vec<(String, String)>,
}

fn syntax(line: usize, message: impl Into<String>) -> DescError {
    DescError::Syntax {
        line,
        message: message.into(),
    }
}

fn number(line: usize, text: &str) -> Result<usize, DescError> {
    text.parse()
        .map_err(|_| syntax(line, format!("number {text} out of range")))
}

/// Reads a site description:
///
/// ```text
/// element SLICEL width 64
/// bel A6LUT bits 0 63 out O6 pins A1 A2 A3 A4 A5 A6
/// bel A5LUT bits 0 31 out O5 pins A1 A2 A3 A4 A5
/// cell and2 A5LUT 4'h8 I0=a I1=b
/// ```
///
/// Everything the element and cell constructors would assert on is
/// reported as an error instead.
pub fn parse_site(text: &str) -> Result<SiteDescription, DescError> {
    let element_re = Regex::new(r"^element\s+(\S+)\s+width\s+([0-9]+)$").unwrap();
    let bel_re =
        Regex::new(r"^bel\s+(\S+)\s+bits\s+([0-9]+)\s+([0-9]+)\s+out\s+(\S+)\s+pins((?:\s+\S+)+)$")
            .unwrap();
    let cell_re = Regex::new(r"^cell\s+(\S+)\s+(\S+)\s+(\S+)((?:\s+\S+)*)$").unwrap();

    let mut element_line: Option<(usize, String, usize)> = None;
    let mut lut_bels: Vec<LutBel> = Vec::new();
    let mut pin_positions: BTreeMap<String, usize> = BTreeMap::new();
    let mut pending_cells: Vec<PendingCell> = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = index + 1;
        let content = match raw_line.find('#') {
            Some(position) => &raw_line[..position],
            None => raw_line,
        }
        .trim();
        if content.is_empty() {
            continue;
        }

        if let Some(captures) = element_re.captures(content) {
            if element_line.is_some() {
                return Err(syntax(line, "second element line"));
            }
            let width = number(line, &captures[2])?;
            element_line = Some((line, captures[1].to_owned(), width));
        } else if let Some(captures) = bel_re.captures(content) {
            let name = captures[1].to_owned();
            let low_bit = number(line, &captures[2])?;
            let high_bit = number(line, &captures[3])?;
            let pins: Vec<&str> = captures[5].split_whitespace().collect();

            if pins.len() > MAX_SITE_PINS {
                return Err(syntax(line, format!("BEL {name} has {} pins", pins.len())));
            }
            if high_bit < low_bit || high_bit - low_bit + 1 != 1 << pins.len() {
                return Err(syntax(
                    line,
                    format!(
                        "BEL {name} with {} pins cannot span bits {low_bit} to {high_bit}",
                        pins.len()
                    ),
                ));
            }
            if lut_bels.iter().any(|lut_bel| lut_bel.name == name) {
                return Err(syntax(line, format!("BEL {name} defined twice")));
            }
            for (position, pin) in pins.iter().enumerate() {
                if pins[..position].contains(pin) {
                    return Err(syntax(line, format!("BEL {name} lists pin {pin} twice")));
                }
                match pin_positions.entry(pin.to_string()) {
                    Entry::Vacant(entry) => {
                        entry.insert(position);
                    }
                    Entry::Occupied(entry) => {
                        if *entry.get() != position {
                            return Err(syntax(
                                line,
                                format!(
                                    "pin {pin} is at position {position} here but at {} in an earlier BEL",
                                    entry.get()
                                ),
                            ));
                        }
                    }
                }
            }

            lut_bels.push(LutBel::new(name, &captures[4], pins, low_bit, high_bit));
        } else if let Some(captures) = cell_re.captures(content) {
            let equation: LutEquation = captures[3]
                .parse()
                .map_err(|source| DescError::Init { line, source })?;
            let mut inputs = Vec::new();
            for binding in captures[4].split_whitespace() {
                let Some((pin, net)) = binding.split_once('=') else {
                    return Err(syntax(line, format!("expected <pin>=<net>, found {binding}")));
                };
                if pin.is_empty() || net.is_empty() {
                    return Err(syntax(line, format!("expected <pin>=<net>, found {binding}")));
                }
                inputs.push((pin.to_owned(), net.to_owned()));
            }
            pending_cells.push(PendingCell {
                line,
                name: captures[1].to_owned(),
                bel: captures[2].to_owned(),
                equation,
                inputs,
            });
        } else {
            return Err(syntax(line, format!("cannot parse {content:?}")));
        }
    }

    let Some((element_line, element_name, width)) = element_line else {
        return Err(DescError::NoElement);
    };
    if lut_bels.is_empty() {
        return Err(syntax(element_line, format!("site {element_name} has no BELs")));
    }
    for lut_bel in lut_bels.iter() {
        if lut_bel.high_bit >= width {
            return Err(syntax(
                element_line,
                format!(
                    "BEL {} ends at bit {} past the {width}-bit equation",
                    lut_bel.name, lut_bel.high_bit
                ),
            ));
        }
    }
    let mut positions: Vec<usize> = pin_positions.values().copied().collect();
    positions.sort();
    if positions.iter().enumerate().any(|(index, &position)| index != position) {
        return Err(syntax(
            element_line,
            format!("pin positions of site {element_name} are not dense"),
        ));
    }
    if positions.len() > MAX_SITE_PINS {
        return Err(syntax(
            element_line,
            format!("site {element_name} has {} pins", positions.len()),
        ));
    }
    let element = LutElement::new(element_name, width, lut_bels);

    let design = Design::new();
    let mut nets: BTreeMap<String, Net> = BTreeMap::new();
    let mut cells: Vec<LutCell> = Vec::new();
    for pending in pending_cells {
        let line = pending.line;
        let Some(bel) = element.bel_index(&pending.bel) else {
            return Err(syntax(line, format!("unknown BEL {}", pending.bel)));
        };
        if let Some(other) = cells.iter().find(|cell| cell.bel == bel) {
            return Err(syntax(
                line,
                format!("BEL {} already holds cell {}", pending.bel, other.name),
            ));
        }
        if cells.iter().any(|cell| cell.name == pending.name) {
            return Err(syntax(line, format!("cell {} defined twice", pending.name)));
        }
        if pending.equation.ninputs() != pending.inputs.len() {
            return Err(syntax(
                line,
                format!(
                    "INIT of cell {} has {} inputs but {} are bound",
                    pending.name,
                    pending.equation.ninputs(),
                    pending.inputs.len()
                ),
            ));
        }
        if pending.inputs.len() > element.lut_bels[bel].pins.len() {
            return Err(syntax(
                line,
                format!(
                    "cell {} has more inputs than BEL {} has pins",
                    pending.name, pending.bel
                ),
            ));
        }

        let mut inputs: Vec<(String, Net)> = Vec::new();
        for (pin, net_name) in pending.inputs {
            if inputs.iter().any(|(other, _)| *other == pin) {
                return Err(syntax(line, format!("pin {pin} bound twice")));
            }
            let net = *nets
                .entry(net_name.clone())
                .or_insert_with(|| design.add_input1(net_name.as_str()));
            if inputs.iter().any(|&(_, other)| other == net) {
                return Err(syntax(
                    line,
                    format!("net {net_name} drives more than one pin of {}", pending.name),
                ));
            }
            inputs.push((pin, net));
        }
        cells.push(LutCell::new(pending.name, bel, inputs, pending.equation));
    }

    Ok(SiteDescription {
        design,
        element,
        cells,
        nets,
    })
}

#[cfg(test)]
mod test {
    use crate::desc::parse_site;
    use crate::error::{DescError, InitParseError};

    const SLICE: &str = "
        # fractured LUT6
        element SLICEL width 64
        bel A6LUT bits 0 63 out O6 pins A1 A2 A3 A4 A5 A6
        bel A5LUT bits 0 31 out O5 pins A1 A2 A3 A4 A5
    ";

    fn syntax_line(text: &str) -> usize {
        match parse_site(text) {
            Err(DescError::Syntax { line, .. }) => line,
            Err(err) => panic!("unexpected error {err}"),
            Ok(_) => panic!("description accepted"),
        }
    }

    #[test]
    fn test_parse_slice() {
        let text = format!("{SLICE}\ncell and A5LUT 4'h8 I0=a I1=b # and gate\ncell buf A6LUT 2'b10 I0=a\n");
        let site = parse_site(&text).unwrap();
        assert_eq!(site.element.name, "SLICEL");
        assert_eq!(site.element.width, 64);
        assert_eq!(site.element.pins.len(), 6);
        assert_eq!(site.element.lut_bels[1].max_pin, 4);

        assert_eq!(site.cells.len(), 2);
        assert_eq!(site.cells[0].bel, 1);
        assert_eq!(site.cells[0].pins, vec!["I0", "I1"]);
        assert_eq!(site.cells[0].equation.to_string(), "4'h8");
        // nets are shared by name
        assert_eq!(site.cells[0].nets[0], site.cells[1].nets[0]);
        assert_ne!(site.cells[0].nets[0], site.cells[0].nets[1]);
        assert_eq!(site.nets.len(), 2);
        assert_eq!(site.net_name(site.cells[0].nets[1]), Some("b"));
    }

    #[test]
    fn test_missing_element() {
        assert!(matches!(
            parse_site("bel L bits 0 1 out O pins I0"),
            Err(DescError::NoElement)
        ));
    }

    #[test]
    fn test_bad_bel_span() {
        assert_eq!(
            syntax_line("element S width 8\nbel L bits 0 6 out O pins I0 I1"),
            2
        );
        assert_eq!(
            syntax_line("element S width 4\nbel L bits 0 7 out O pins I0 I1 I2"),
            1
        );
    }

    #[test]
    fn test_inconsistent_pins() {
        assert_eq!(
            syntax_line(
                "element S width 8\nbel X bits 0 3 out O pins P Q\nbel Y bits 4 7 out O pins Q P"
            ),
            3
        );
        assert_eq!(
            syntax_line("element S width 4\nbel X bits 0 1 out O pins P\nbel Y bits 2 3 out O pins Q"),
            1
        );
    }

    #[test]
    fn test_bad_cells() {
        let unknown_bel = format!("{SLICE}\ncell c B6LUT 2'h2 I0=a");
        assert_eq!(syntax_line(&unknown_bel), 7);
        let width_mismatch = format!("{SLICE}\ncell c A6LUT 4'h8 I0=a");
        assert_eq!(syntax_line(&width_mismatch), 7);
        let shared_bel = format!("{SLICE}\ncell c A6LUT 2'h2 I0=a\ncell d A6LUT 2'h1 I0=b");
        assert_eq!(syntax_line(&shared_bel), 8);
        let same_net = format!("{SLICE}\ncell c A6LUT 4'h6 I0=a I1=a");
        assert_eq!(syntax_line(&same_net), 7);
        let no_net = format!("{SLICE}\ncell c A6LUT 2'h2 I0");
        assert_eq!(syntax_line(&no_net), 7);

        let bad_init = format!("{SLICE}\ncell c A6LUT 3'h2 I0=a");
        assert!(matches!(
            parse_site(&bad_init),
            Err(DescError::Init {
                line: 7,
                source: InitParseError::Width(3)
            })
        ));
    }
}

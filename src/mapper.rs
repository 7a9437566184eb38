// site LUT mapper
use crate::element::{BelIndex, LutBel, LutElement};
use crate::equation::LutEquation;
use crate::error::MappingError;
use crate::rotate::rotate_and_merge_lut_equation;
use crate::trace::{map_trace, MapTrace};
use crate::verify::check_equation;
use crate::wires::check_wires;
use prjunnamed_netlist::{Const, Net};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PinConnection {
    Unconnected,
    Gnd,
    Vcc,
    Const,
    Signal,
}

impl fmt::Display for PinConnection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PinConnection::Unconnected => write!(f, "unconnected"),
            PinConnection::Gnd => write!(f, "Gnd"),
            PinConnection::Vcc => write!(f, "Vcc"),
            PinConnection::Const => write!(f, "Const"),
            PinConnection::Signal => write!(f, "Signal"),
        }
    }
}

/// A LUT cell placed on one of the site's LUT BELs.
#[derive(Debug, Clone)]
pub struct LutCell {
    pub name: String,
    pub bel: BelIndex,
    pub pins: Vec<String>,
    /// Net driving each entry of `pins`.
    pub nets: Vec<Net>,
    pub equation: LutEquation,
    /// Committed cell pin to BEL pin binding, see [`SiteLutMapping::apply`].
    pub bel_pins: BTreeMap<String, String>,
    pub pin_connections: BTreeMap<String, PinConnection>,
}

impl LutCell {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        bel: BelIndex,
        inputs: impl IntoIterator<Item = (S, Net)>,
        equation: LutEquation,
    ) -> Self {
        let name = name.into();
        let (pins, nets): (Vec<String>, Vec<Net>) = inputs
            .into_iter()
            .map(|(pin, net)| (pin.into(), net))
            .unzip();
        assert_eq!(
            equation.ninputs(),
            pins.len(),
            "equation of LUT cell {name} does not match its {} pins",
            pins.len()
        );
        for (index, net) in nets.iter().enumerate() {
            assert!(
                *net != Net::UNDEF,
                "pin {} of LUT cell {name} is not connected",
                pins[index]
            );
            assert!(
                !nets[..index].contains(net),
                "LUT cell {name} uses the same net on more than one pin"
            );
        }
        Self {
            name,
            bel,
            pins,
            nets,
            equation,
            bel_pins: BTreeMap::new(),
            pin_connections: BTreeMap::new(),
        }
    }
}

struct LutPinUser {
    cell_idx: usize,
    cell_pin_idx: usize,
}

/// A net entering the site, with every cell pin it drives.
struct LutPin {
    net: Net,
    users: Vec<LutPinUser>,
    min_pin: usize,
    max_pin: usize,
}

impl LutPin {
    fn new(net: Net) -> Self {
        Self {
            net,
            users: Vec::new(),
            min_pin: 0,
            max_pin: usize::MAX,
        }
    }

    // only tracks the intersection of the BEL pin ranges
    fn add_user(&mut self, lut_bel: &LutBel, cell_idx: usize, cell_pin_idx: usize) {
        self.min_pin = self.min_pin.max(lut_bel.min_pin);
        self.max_pin = self.max_pin.min(lut_bel.max_pin);
        self.users.push(LutPinUser {
            cell_idx,
            cell_pin_idx,
        });
    }
}

#[derive(Debug, Clone)]
pub struct MappedCell {
    pub cell: String,
    pub bel: BelIndex,
    pub bel_pins: BTreeMap<String, String>,
    pub pin_connections: BTreeMap<String, PinConnection>,
}

/// Result of a successful mapping attempt for one site.
#[derive(Debug, Clone)]
pub struct SiteLutMapping {
    pub cells: Vec<MappedCell>,
    /// Unoccupied BELs that cannot route any spare pin as a wire.
    pub blocked_bels: BTreeSet<BelIndex>,
    /// Spare site pins that have to be tied to a constant.
    pub pin_mask: u32,
    pub equation: Const,
}

impl SiteLutMapping {
    /// Commits the pin bindings to the cells they were computed for.
    pub fn apply(&self, cells: &mut [LutCell]) {
        for mapped in self.cells.iter() {
            let Some(cell) = cells.iter_mut().find(|cell| cell.name == mapped.cell) else {
                panic!("cell {} is not part of this site", mapped.cell);
            };
            assert_eq!(cell.bel, mapped.bel, "cell {} moved", cell.name);
            cell.bel_pins = mapped.bel_pins.clone();
            cell.pin_connections = mapped.pin_connections.clone();
        }
    }
}

pub struct LutMapper<'a> {
    pub(crate) element: &'a LutElement,
    pub(crate) cells: Vec<&'a LutCell>,
}

impl<'a> LutMapper<'a> {
    pub fn new(element: &'a LutElement) -> Self {
        Self {
            element,
            cells: Vec::new(),
        }
    }

    pub fn add_cell(&mut self, cell: &'a LutCell) {
        assert!(
            cell.bel < self.element.lut_bels.len(),
            "cell {} placed on a BEL outside of site {}",
            cell.name,
            self.element.name
        );
        if let Some(other) = self.cells.iter().find(|other| other.bel == cell.bel) {
            panic!(
                "cells {} and {} share LUT BEL {}",
                other.name, cell.name, self.element.lut_bels[cell.bel].name
            );
        }
        self.cells.push(cell);
    }

    pub fn cells(&self) -> &[&'a LutCell] {
        &self.cells
    }

    /// Assigns the nets entering the site to site pins and merges the cell
    /// equations into the site equation.
    ///
    /// The assignment is a single greedy pass: nets are ordered by the last
    /// pin they may use, and the `i`-th net goes to pin `i`. No other order
    /// is attempted if this one fails.
    pub fn remap_luts(&self, trace: &mut dyn MapTrace) -> Result<SiteLutMapping, MappingError> {
        let element = self.element;
        let lut_bels: Vec<&LutBel> = self
            .cells
            .iter()
            .map(|cell| &element.lut_bels[cell.bel])
            .collect();

        let mut lut_pins: Vec<LutPin> = Vec::new();
        let mut lut_pin_by_net: HashMap<Net, usize> = HashMap::new();
        for (cell_idx, cell) in self.cells.iter().enumerate() {
            map_trace!(
                trace,
                "Mapping {} eq = {} at {}",
                cell.name,
                cell.equation,
                lut_bels[cell_idx].name
            );

            for (pin_idx, &net) in cell.nets.iter().enumerate() {
                let lut_pin_idx = *lut_pin_by_net.entry(net).or_insert_with(|| {
                    lut_pins.push(LutPin::new(net));
                    lut_pins.len() - 1
                });
                lut_pins[lut_pin_idx].add_user(lut_bels[cell_idx], cell_idx, pin_idx);
            }
        }

        if lut_pins.len() > element.pins.len() {
            map_trace!(
                trace,
                "Trivial failure {} > {}, {} {}",
                lut_pins.len(),
                element.pins.len(),
                element.width,
                element.lut_bels.len()
            );
            return Err(MappingError::TooManyNets {
                nets: lut_pins.len(),
                pins: element.pins.len(),
            });
        }

        lut_pins.sort_by_key(|lut_pin| lut_pin.max_pin);

        let mut cell_to_bel_pin_remaps: Vec<Vec<usize>> = self
            .cells
            .iter()
            .map(|cell| vec![0; cell.pins.len()])
            .collect();
        let mut bel_to_cell_pin_remaps: Vec<Vec<Option<usize>>> = lut_bels
            .iter()
            .map(|lut_bel| vec![None; lut_bel.pins.len()])
            .collect();

        let mut used_pins: u32 = 0;
        let mut net_pins: Vec<Option<&str>> = vec![None; lut_pins.len()];
        for (net_idx, lut_pin) in lut_pins.iter().enumerate() {
            if net_idx < lut_pin.min_pin || net_idx > lut_pin.max_pin {
                map_trace!(
                    trace,
                    "No room for net {:?}: pin {} outside {}..={}",
                    lut_pin.net,
                    net_idx,
                    lut_pin.min_pin,
                    lut_pin.max_pin
                );
                return Err(MappingError::PinOutOfRange {
                    net_index: net_idx,
                    min_pin: lut_pin.min_pin,
                    max_pin: lut_pin.max_pin,
                });
            }
            used_pins |= 1 << net_idx;

            for user in lut_pin.users.iter() {
                let cell = self.cells[user.cell_idx];
                let bel_pin = lut_bels[user.cell_idx].pins[net_idx].as_str();
                map_trace!(
                    trace,
                    "{} {} => {} ({:?})",
                    cell.name,
                    cell.pins[user.cell_pin_idx],
                    bel_pin,
                    lut_pin.net
                );
                match net_pins[net_idx] {
                    None => net_pins[net_idx] = Some(bel_pin),
                    Some(other) => assert_eq!(other, bel_pin),
                }

                cell_to_bel_pin_remaps[user.cell_idx][user.cell_pin_idx] = net_idx;
                bel_to_cell_pin_remaps[user.cell_idx][net_idx] = Some(user.cell_pin_idx);
            }
        }

        let mut equation = Const::undef(element.width);
        for (cell_idx, cell) in self.cells.iter().enumerate() {
            if !rotate_and_merge_lut_equation(
                &mut equation,
                lut_bels[cell_idx],
                &cell.equation,
                &bel_to_cell_pin_remaps[cell_idx],
                used_pins,
            ) {
                map_trace!(trace, "Failed to find a solution!");
                for cell in self.cells.iter() {
                    map_trace!(trace, "{} : {}", cell.name, cell.equation);
                }
                return Err(MappingError::EquationConflict {
                    cell: cell.name.clone(),
                });
            }
        }
        map_trace!(trace, "Found a solution!");

        let cell_bel_pins: Vec<BTreeMap<String, String>> = self
            .cells
            .iter()
            .enumerate()
            .map(|(cell_idx, cell)| {
                cell.pins
                    .iter()
                    .zip(cell_to_bel_pin_remaps[cell_idx].iter())
                    .map(|(cell_pin, &bel_pin_idx)| {
                        (cell_pin.clone(), lut_bels[cell_idx].pins[bel_pin_idx].clone())
                    })
                    .collect()
            })
            .collect();

        for (cell_idx, cell) in self.cells.iter().enumerate() {
            check_equation(
                cell,
                &cell_bel_pins[cell_idx],
                lut_bels[cell_idx],
                &equation,
                used_pins,
            );
        }

        let all_luts_used = self.cells.len() == element.lut_bels.len();
        let mut blocked_bels = BTreeSet::new();
        let mut pin_mask = 0;
        if !all_luts_used {
            pin_mask = check_wires(
                element,
                &self.cells,
                &bel_to_cell_pin_remaps,
                used_pins,
                &mut blocked_bels,
            );
        }

        map_trace!(trace, "Cell bindings:");
        let mut mapped_cells = Vec::with_capacity(self.cells.len());
        for (cell_idx, (cell, bel_pins)) in self.cells.iter().zip(cell_bel_pins).enumerate() {
            let lut_bel = lut_bels[cell_idx];
            map_trace!(trace, " - {} => {}", lut_bel.name, cell.name);

            // without spare BELs there is nothing to route through, every
            // pin not carrying a net is tied off
            let const_pins = if all_luts_used { !used_pins } else { pin_mask };
            let mut pin_connections = BTreeMap::new();
            for (bel_pin_idx, bel_pin) in lut_bel.pins.iter().enumerate() {
                let connection = if const_pins & (1 << bel_pin_idx) != 0 {
                    assert_eq!(bel_to_cell_pin_remaps[cell_idx][bel_pin_idx], None);
                    PinConnection::Const
                } else {
                    PinConnection::Signal
                };
                pin_connections.insert(bel_pin.clone(), connection);
            }

            map_trace!(trace, "Pin connections for LUT cell {}:", cell.name);
            for (bel_pin, connection) in pin_connections.iter() {
                map_trace!(trace, " - {} : {}", bel_pin, connection);
            }

            mapped_cells.push(MappedCell {
                cell: cell.name.clone(),
                bel: cell.bel,
                bel_pins,
                pin_connections,
            });
        }

        Ok(SiteLutMapping {
            cells: mapped_cells,
            blocked_bels,
            pin_mask,
            equation,
        })
    }
}

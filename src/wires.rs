// routing spare site pins through unoccupied LUT BELs
use crate::element::{BelIndex, LutElement};
use crate::equation::LutEquation;
use crate::mapper::{LutCell, LutMapper};
use crate::rotate::rotate_and_merge_lut_equation;
use prjunnamed_netlist::Const;
use std::collections::BTreeSet;

/// Finds the spare site pins that can be passed through an unoccupied BEL
/// as a wire without disturbing the placed cells.
///
/// Returns the mask of spare pins that cannot and must be tied off. Every
/// unoccupied BEL is added to `blocked_luts` unless at least one spare pin
/// can be routed through it.
pub(crate) fn check_wires(
    element: &LutElement,
    cells: &[&LutCell],
    bel_to_cell_pin_remaps: &[Vec<Option<usize>>],
    used_pins: u32,
    blocked_luts: &mut BTreeSet<BelIndex>,
) -> u32 {
    assert_eq!(cells.len(), bel_to_cell_pin_remaps.len());

    let unused_luts: Vec<BelIndex> = (0..element.lut_bels.len())
        .filter(|&bel| cells.iter().all(|cell| cell.bel != bel))
        .collect();
    blocked_luts.extend(unused_luts.iter().copied());

    // output follows the single input
    let wire_equation = LutEquation::from_truth6(0b10, 1);

    let mut pin_mask = 0;
    for pin_idx in 0..element.pins.len() {
        if used_pins & (1 << pin_idx) != 0 {
            continue;
        }
        let used_pins_with_wire = used_pins | (1 << pin_idx);

        let candidates: Vec<BelIndex> = unused_luts
            .iter()
            .copied()
            .filter(|&bel| {
                let lut_bel = &element.lut_bels[bel];
                lut_bel.min_pin <= pin_idx && pin_idx <= lut_bel.max_pin
            })
            .collect();

        // the cells see one more live address line with the wire in place
        let mut cells_equation = Const::undef(element.width);
        let cells_fit = candidates.is_empty()
            || cells.iter().zip(bel_to_cell_pin_remaps).all(|(cell, pin_map)| {
                rotate_and_merge_lut_equation(
                    &mut cells_equation,
                    &element.lut_bels[cell.bel],
                    &cell.equation,
                    pin_map,
                    used_pins_with_wire,
                )
            });

        let mut valid_pin_for_wire = false;
        if cells_fit {
            for &bel in candidates.iter() {
                let lut_bel = &element.lut_bels[bel];
                let mut wire_pin_map = vec![None; lut_bel.pins.len()];
                wire_pin_map[lut_bel.pin_to_index[&element.pins[pin_idx]]] = Some(0);

                let mut equation = cells_equation.clone();
                if rotate_and_merge_lut_equation(
                    &mut equation,
                    lut_bel,
                    &wire_equation,
                    &wire_pin_map,
                    used_pins_with_wire,
                ) {
                    valid_pin_for_wire = true;
                    blocked_luts.remove(&bel);
                }
            }
        }

        if !valid_pin_for_wire {
            pin_mask |= 1 << pin_idx;
        }
    }

    pin_mask
}

impl LutMapper<'_> {
    /// Recomputes the tie-off mask from the pin bindings already committed
    /// to the cells, without remapping them.
    pub fn check_current_wires(&self) -> u32 {
        let mut used_pins = 0;
        let mut bel_to_cell_pin_remaps = Vec::with_capacity(self.cells.len());
        for cell in self.cells.iter() {
            let lut_bel = &self.element.lut_bels[cell.bel];
            let mut pin_map = vec![None; lut_bel.pins.len()];
            for (cell_pin_idx, cell_pin) in cell.pins.iter().enumerate() {
                let Some(bel_pin) = cell.bel_pins.get(cell_pin) else {
                    panic!("pin {cell_pin} of cell {} is not bound to a BEL pin", cell.name);
                };
                let bel_pin_idx = lut_bel.pin_to_index[bel_pin];
                pin_map[bel_pin_idx] = Some(cell_pin_idx);
                used_pins |= 1 << bel_pin_idx;
            }
            bel_to_cell_pin_remaps.push(pin_map);
        }

        let mut blocked_luts = BTreeSet::new();
        check_wires(
            self.element,
            &self.cells,
            &bel_to_cell_pin_remaps,
            used_pins,
            &mut blocked_luts,
        )
    }
}

#[cfg(test)]
mod test {
    use crate::element::{LutBel, LutElement};
    use crate::equation::LutEquation;
    use crate::mapper::{LutCell, LutMapper, PinConnection};
    use crate::rotate::rotate_and_merge_lut_equation;
    use crate::trace::NoTrace;
    use crate::verify::check_equation;
    use prjunnamed_netlist::{Const, Design, Net};
    use std::collections::{BTreeMap, BTreeSet};

    fn nets(count: usize) -> Vec<Net> {
        let design = Design::new();
        (0..count)
            .map(|index| design.add_input1(format!("n{index}")))
            .collect()
    }

    fn slice_site() -> LutElement {
        LutElement::new(
            "SLICEL",
            64,
            vec![
                LutBel::new("A6LUT", "O6", ["A1", "A2", "A3", "A4", "A5", "A6"], 0, 63),
                LutBel::new("A5LUT", "O5", ["A1", "A2", "A3", "A4", "A5"], 0, 31),
            ],
        )
    }

    #[test]
    fn test_wire_through_lut6() {
        let element = slice_site();
        let n = nets(2);
        let and = LutCell::new("and", 1, [("A", n[0]), ("B", n[1])], "4'h8".parse().unwrap());
        let mut mapper = LutMapper::new(&element);
        mapper.add_cell(&and);
        let mapping = mapper.remap_luts(&mut NoTrace).unwrap();

        // A3..A5 pass through the LUT6 above the LUT5 half; A6 low would
        // land on the AND
        assert_eq!(mapping.pin_mask, 0b100000);
        assert!(mapping.blocked_bels.is_empty());
        let connections = &mapping.cells[0].pin_connections;
        assert_eq!(connections["A1"], PinConnection::Signal);
        assert_eq!(connections["A3"], PinConnection::Signal);
        assert_eq!(connections["A5"], PinConnection::Signal);
        assert_eq!(connections.get("A6"), None);
    }

    #[test]
    fn test_wire_is_sound() {
        let element = slice_site();
        let n = nets(2);
        let and = LutCell::new("and", 1, [("A", n[0]), ("B", n[1])], "4'h8".parse().unwrap());
        let pin_map = [Some(0), Some(1), None, None, None];
        let used_pins = 0b00111;

        let mut equation = Const::undef(64);
        assert!(rotate_and_merge_lut_equation(
            &mut equation,
            &element.lut_bels[1],
            &and.equation,
            &pin_map,
            used_pins
        ));
        let wire = LutEquation::from_truth6(0b10, 1);
        assert!(rotate_and_merge_lut_equation(
            &mut equation,
            &element.lut_bels[0],
            &wire,
            &[None, None, Some(0), None, None, None],
            used_pins
        ));

        let bel_pins = BTreeMap::from([
            ("A".to_owned(), "A1".to_owned()),
            ("B".to_owned(), "A2".to_owned()),
        ]);
        check_equation(&and, &bel_pins, &element.lut_bels[1], &equation, used_pins);
    }

    #[test]
    fn test_no_room_for_wire() {
        let element = slice_site();
        let n = nets(5);
        let inputs = ["I0", "I1", "I2", "I3", "I4"]
            .into_iter()
            .zip(n.iter().copied());
        let and5 = LutCell::new("and5", 0, inputs, LutEquation::from_fn(5, |a| a == 31));
        let mut mapper = LutMapper::new(&element);
        mapper.add_cell(&and5);
        let mapping = mapper.remap_luts(&mut NoTrace).unwrap();

        // the LUT5 cannot reach A6, the only spare pin
        assert_eq!(mapping.pin_mask, 0b100000);
        assert_eq!(mapping.blocked_bels, BTreeSet::from([1]));
        let connections = &mapping.cells[0].pin_connections;
        assert_eq!(connections["A6"], PinConnection::Const);
        assert_eq!(connections["A5"], PinConnection::Signal);
    }

    #[test]
    fn test_current_wires_match_mapping() {
        let element = slice_site();
        let n = nets(2);
        let mut cells =
            vec![LutCell::new("and", 1, [("A", n[0]), ("B", n[1])], "4'h8".parse().unwrap())];
        let pin_mask = {
            let mut mapper = LutMapper::new(&element);
            mapper.add_cell(&cells[0]);
            let mapping = mapper.remap_luts(&mut NoTrace).unwrap();
            mapping.apply(&mut cells);
            mapping.pin_mask
        };
        assert_eq!(cells[0].bel_pins["A"], "A1");
        assert_eq!(cells[0].bel_pins["B"], "A2");

        let mut mapper = LutMapper::new(&element);
        mapper.add_cell(&cells[0]);
        assert_eq!(mapper.check_current_wires(), pin_mask);
    }

    #[test]
    #[should_panic]
    fn test_current_wires_needs_bindings() {
        let element = slice_site();
        let n = nets(1);
        let buf = LutCell::new("buf", 0, [("A", n[0])], "2'h2".parse().unwrap());
        let mut mapper = LutMapper::new(&element);
        mapper.add_cell(&buf);
        mapper.check_current_wires();
    }
}

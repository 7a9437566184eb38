// consistency check of a merged site equation
use crate::element::LutBel;
use crate::mapper::LutCell;
use prjunnamed_netlist::{Const, Trit};
use std::collections::BTreeMap;

/// Asserts that `equation` implements the cell's truth table once the cell
/// pins are wired to BEL pins as given by `cell_to_bel_map`.
///
/// Walks the cell's own address space and expands every cell address into
/// all BEL addresses it can appear at, i.e. the reverse direction of
/// [`rotate_and_merge_lut_equation`](crate::rotate::rotate_and_merge_lut_equation).
/// A mismatch means the mapper produced an inconsistent result.
pub fn check_equation(
    lut_cell: &LutCell,
    cell_to_bel_map: &BTreeMap<String, String>,
    lut_bel: &LutBel,
    equation: &Const,
    used_pins: u32,
) {
    let bel_width = lut_bel.width();
    assert_eq!(lut_bel.low_bit + bel_width, lut_bel.high_bit + 1);
    assert!(lut_bel.high_bit < equation.len());

    let mut bel_pin_of_cell_pin = Vec::with_capacity(lut_cell.pins.len());
    let mut cell_pins_mask = 0;
    for cell_pin in lut_cell.pins.iter() {
        let bel_pin = &cell_to_bel_map[cell_pin];
        let bel_pin_idx = lut_bel.pin_to_index[bel_pin];
        assert!(
            cell_pins_mask & (1 << bel_pin_idx) == 0,
            "two pins of cell {} bound to BEL pin {bel_pin}",
            lut_cell.name
        );
        assert!(
            used_pins & (1 << bel_pin_idx) != 0,
            "BEL pin {bel_pin} of cell {} is not marked used",
            lut_cell.name
        );
        cell_pins_mask |= 1 << bel_pin_idx;
        bel_pin_of_cell_pin.push(bel_pin_idx);
    }

    let bel_pins_mask = bel_width - 1;
    let free_mask = bel_pins_mask & !cell_pins_mask;
    // BEL lines that may not be driven low
    let tied_mask = bel_pins_mask & !(used_pins as usize);

    for cell_address in 0..lut_cell.equation.len() {
        let level = Trit::from(lut_cell.equation.get(cell_address));

        let mut base_address = 0;
        for (cell_pin_idx, &bel_pin_idx) in bel_pin_of_cell_pin.iter().enumerate() {
            if cell_address & (1 << cell_pin_idx) != 0 {
                base_address |= 1 << bel_pin_idx;
            }
        }

        let mut reachable = 0;
        let mut free_bits = free_mask;
        loop {
            let bel_address = base_address | free_bits;
            if (!bel_address & tied_mask) == 0 {
                assert_eq!(
                    equation[lut_bel.low_bit + bel_address],
                    level,
                    "cell {} address {cell_address} disagrees with BEL {} address {bel_address}",
                    lut_cell.name,
                    lut_bel.name
                );
                reachable += 1;
            }
            if free_bits == 0 {
                break;
            }
            free_bits = (free_bits - 1) & free_mask;
        }
        assert!(
            reachable > 0,
            "cell {} address {cell_address} is unreachable in BEL {}",
            lut_cell.name,
            lut_bel.name
        );
    }
}

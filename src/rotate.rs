// LUT pin rotation and equation merging
use crate::element::LutBel;
use crate::equation::LutEquation;
use prjunnamed_netlist::{Const, Trit};

/// Translates a BEL address into the address of a cell placed on it.
///
/// `pin_map[bel_pin]` is the cell pin wired to that BEL pin, if any.
/// Returns `None` when the address cannot occur: an unused BEL pin is
/// tied high, so its address line is never 0.
pub fn translate_address(
    bel_address: usize,
    pin_map: &[Option<usize>],
    used_pins: u32,
) -> Option<usize> {
    let mut cell_address = 0;
    for (bel_pin_idx, cell_pin_idx) in pin_map.iter().enumerate() {
        if bel_address & (1 << bel_pin_idx) == 0 {
            if used_pins & (1 << bel_pin_idx) == 0 {
                return None;
            }
            continue;
        }

        // pins not used by this cell are don't-cares for its equation
        if let Some(cell_pin_idx) = cell_pin_idx {
            cell_address |= 1 << cell_pin_idx;
        }
    }
    Some(cell_address)
}

/// Writes `old_equation`, as seen through `pin_map`, into the part of the
/// site equation owned by `lut_bel`.
///
/// Returns `false` if some bit already holds the opposite value. The
/// site equation is left partially updated in that case.
pub fn rotate_and_merge_lut_equation(
    result: &mut Const,
    lut_bel: &LutBel,
    old_equation: &LutEquation,
    pin_map: &[Option<usize>],
    used_pins: u32,
) -> bool {
    assert_eq!(pin_map.len(), lut_bel.pins.len());
    assert!(lut_bel.high_bit < result.len());

    for bel_address in 0..lut_bel.width() {
        let Some(cell_address) = translate_address(bel_address, pin_map, used_pins) else {
            continue;
        };

        let level = Trit::from(old_equation.get(cell_address));
        let slot = &mut result[lut_bel.low_bit + bel_address];
        if *slot != Trit::Undef && *slot != level {
            return false;
        }
        *slot = level;
    }

    true
}

#[cfg(test)]
mod test {
    use crate::element::LutBel;
    use crate::equation::LutEquation;
    use crate::rotate::{rotate_and_merge_lut_equation, translate_address};
    use prjunnamed_netlist::{Const, Trit};

    fn lut4() -> LutBel {
        LutBel::new("LUT4", "O", ["I0", "I1", "I2", "I3"], 0, 15)
    }

    #[test]
    fn test_translate() {
        let pin_map = [Some(1), None, Some(0)];
        assert_eq!(translate_address(0b111, &pin_map, 0b101), Some(0b11));
        assert_eq!(translate_address(0b011, &pin_map, 0b101), Some(0b10));
        assert_eq!(translate_address(0b110, &pin_map, 0b101), Some(0b01));
        // line 1 is unused, so it is never low
        assert_eq!(translate_address(0b101, &pin_map, 0b101), None);
        assert_eq!(translate_address(0b101, &pin_map, 0b111), Some(0b11));
    }

    #[test]
    fn test_reversed_pins() {
        let bel = lut4();
        // A & !D with pins in reverse order
        let eq = LutEquation::from_fn(4, |a| a & 1 != 0 && a & 8 == 0);
        let mut result = Const::undef(16);
        let pin_map = [Some(3), Some(2), Some(1), Some(0)];
        assert!(rotate_and_merge_lut_equation(&mut result, &bel, &eq, &pin_map, 0b1111));
        for address in 0..16 {
            let expected = Trit::from(address & 8 != 0 && address & 1 == 0);
            assert_eq!(result[address], expected, "address {address}");
        }
    }

    #[test]
    fn test_unused_pins_unreachable() {
        let bel = lut4();
        let eq = LutEquation::from_truth6(0b1000, 2);
        let mut result = Const::undef(16);
        let pin_map = [Some(0), Some(1), None, None];
        assert!(rotate_and_merge_lut_equation(&mut result, &bel, &eq, &pin_map, 0b0011));
        for address in 0..16 {
            if address & 0b1100 != 0b1100 {
                assert_eq!(result[address], Trit::Undef, "address {address}");
            } else {
                assert_eq!(result[address], Trit::from(address & 3 == 3));
            }
        }
    }

    #[test]
    fn test_conflict() {
        let bel = lut4();
        let eq = LutEquation::from_truth6(0b10, 1);
        let pin_map = [Some(0), None, None, None];

        let mut result = Const::undef(16);
        result[15] = Trit::One;
        assert!(rotate_and_merge_lut_equation(&mut result, &bel, &eq, &pin_map, 0b0001));
        assert_eq!(result[14], Trit::Zero);

        let mut result = Const::undef(16);
        result[15] = Trit::Zero;
        assert!(!rotate_and_merge_lut_equation(&mut result, &bel, &eq, &pin_map, 0b0001));
    }

    #[test]
    fn test_offset_bel() {
        let bel = LutBel::new("HI", "O", ["I0"], 2, 3);
        let eq = LutEquation::from_truth6(0b01, 1);
        let mut result = Const::undef(4);
        assert!(rotate_and_merge_lut_equation(&mut result, &bel, &eq, &[Some(0)], 0b1));
        assert_eq!(result[0], Trit::Undef);
        assert_eq!(result[1], Trit::Undef);
        assert_eq!(result[2], Trit::One);
        assert_eq!(result[3], Trit::Zero);
    }
}

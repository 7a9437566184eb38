// site pin catalog
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

pub type BelIndex = usize;

/// Pin sets are carried around as `u32` masks indexed by site pin.
pub const MAX_SITE_PINS: usize = 32;

/// One LUT placement inside a site.
#[derive(Debug, Clone)]
pub struct LutBel {
    pub name: String,
    pub pins: Vec<String>,
    pub pin_to_index: BTreeMap<String, usize>,
    pub output_pin: String,
    /// First and last bit of the site equation addressed by this BEL.
    pub low_bit: usize,
    pub high_bit: usize,
    /// Site pin range usable through this BEL; filled in by the element.
    pub min_pin: usize,
    pub max_pin: usize,
}

impl LutBel {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        output_pin: impl Into<String>,
        pins: impl IntoIterator<Item = S>,
        low_bit: usize,
        high_bit: usize,
    ) -> Self {
        let name = name.into();
        let pins: Vec<String> = pins.into_iter().map(Into::into).collect();
        assert!(!pins.is_empty(), "LUT BEL {name} has no input pins");
        assert!(
            pins.len() <= MAX_SITE_PINS,
            "LUT BEL {name} has {} input pins",
            pins.len()
        );
        assert_eq!(
            low_bit + (1 << pins.len()),
            high_bit + 1,
            "LUT BEL {name} spans bits {low_bit}..={high_bit} with {} pins",
            pins.len()
        );

        let mut pin_to_index = BTreeMap::new();
        for (index, pin) in pins.iter().enumerate() {
            if pin_to_index.insert(pin.clone(), index).is_some() {
                panic!("LUT BEL {name} lists pin {pin} twice");
            }
        }

        Self {
            name,
            pins,
            pin_to_index,
            output_pin: output_pin.into(),
            low_bit,
            high_bit,
            min_pin: 0,
            max_pin: 0,
        }
    }

    pub fn width(&self) -> usize {
        1 << self.pins.len()
    }
}

/// The LUT BELs of one site type together with the site's shared pin order.
#[derive(Debug, Clone)]
pub struct LutElement {
    pub name: String,
    /// Size of the site equation in bits.
    pub width: usize,
    pub lut_bels: Vec<LutBel>,
    pub pins: Vec<String>,
    pub pin_to_index: BTreeMap<String, usize>,
    bel_by_name: BTreeMap<String, BelIndex>,
}

impl LutElement {
    pub fn new(name: impl Into<String>, width: usize, lut_bels: Vec<LutBel>) -> Self {
        let name = name.into();
        let mut bel_by_name = BTreeMap::new();
        for (index, lut_bel) in lut_bels.iter().enumerate() {
            assert!(
                lut_bel.high_bit < width,
                "LUT BEL {} ends at bit {} past the {width}-bit equation of {name}",
                lut_bel.name,
                lut_bel.high_bit
            );
            if bel_by_name.insert(lut_bel.name.clone(), index).is_some() {
                panic!("site {name} has two LUT BELs named {}", lut_bel.name);
            }
        }

        let mut element = Self {
            name,
            width,
            lut_bels,
            pins: Vec::new(),
            pin_to_index: BTreeMap::new(),
            bel_by_name,
        };
        element.compute_pin_order();
        element
    }

    fn compute_pin_order(&mut self) {
        self.pins.clear();
        self.pin_to_index.clear();

        for lut_bel in &self.lut_bels {
            for (pin_idx, pin) in lut_bel.pins.iter().enumerate() {
                match self.pin_to_index.entry(pin.clone()) {
                    Entry::Vacant(entry) => {
                        entry.insert(pin_idx);
                    }
                    Entry::Occupied(entry) => {
                        assert_eq!(
                            *entry.get(),
                            pin_idx,
                            "pin {pin} of LUT BEL {} disagrees with its position in another BEL",
                            lut_bel.name
                        );
                    }
                }
            }
        }

        self.pins = vec![String::new(); self.pin_to_index.len()];
        for (pin, &index) in self.pin_to_index.iter() {
            assert!(
                index < self.pins.len() && self.pins[index].is_empty(),
                "site pin indices of {} are not dense (pin {pin} at {index})",
                self.name
            );
            self.pins[index] = pin.clone();
        }
        assert!(
            self.pins.len() <= MAX_SITE_PINS,
            "site {} has {} LUT input pins",
            self.name,
            self.pins.len()
        );

        for lut_bel in self.lut_bels.iter_mut() {
            lut_bel.min_pin = self.pin_to_index[&lut_bel.pins[0]];
            lut_bel.max_pin = self.pin_to_index[&lut_bel.pins[lut_bel.pins.len() - 1]];
        }
    }

    pub fn bel_index(&self, name: &str) -> Option<BelIndex> {
        self.bel_by_name.get(name).copied()
    }
}

//! Colors and the coder that names them.
//!
//! A color is a single bit of a byte. Every element of a [`ColorTree`] carries
//! exactly one color, and queries are made against a [`ColorSet`], the union of
//! the colors a caller wants to see. A tree that tracks a filtered list might
//! use two colors, "accepted" and "rejected": the filtered view is the set
//! `{accepted}` and the source view is `{accepted, rejected}`.
//!
//! ```
//! use glazier::color::ColorCoder;
//!
//! let coder = ColorCoder::new(["accepted", "rejected"]).unwrap();
//! let accepted = coder.color_to_byte("accepted").unwrap();
//! assert_eq!(coder.byte_to_color(accepted.bits()), Ok("accepted"));
//! assert_eq!(coder.all().len(), 2);
//! ```
//!
//! [`ColorTree`]: crate::tree::ColorTree

use std::fmt;
use std::ops::BitOr;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Number of distinct colors a coder can register.
pub const MAX_COLORS: usize = 7;

/// Mask of the bits a color may occupy.
const COLOR_BITS: u8 = (1 << MAX_COLORS) - 1;

/// A single color: exactly one of the low seven bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color(u8);

impl Color {
    /// Returns the color occupying `bits`, if `bits` is a single valid bit.
    pub const fn from_bits(bits: u8) -> Option<Color> {
        if bits & COLOR_BITS == bits && bits.count_ones() == 1 {
            return Some(Color(bits));
        }
        return None;
    }

    /// The color for bit position `index`.
    pub const fn from_index(index: usize) -> Option<Color> {
        if index < MAX_COLORS {
            return Some(Color(1 << index));
        }
        return None;
    }

    #[inline(always)]
    pub const fn bits(self) -> u8 {
        return self.0;
    }

    /// Bit position, used to index per-color aggregates.
    #[inline(always)]
    pub const fn index(self) -> usize {
        return self.0.trailing_zeros() as usize;
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "Color({})", self.index());
    }
}

/// A view: the union of any number of colors.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ColorSet(u8);

impl ColorSet {
    pub const EMPTY: ColorSet = ColorSet(0);

    /// Returns the set for `bits`, rejecting bits no color can occupy.
    pub const fn from_bits(bits: u8) -> Option<ColorSet> {
        if bits & COLOR_BITS == bits {
            return Some(ColorSet(bits));
        }
        return None;
    }

    #[inline(always)]
    pub const fn bits(self) -> u8 {
        return self.0;
    }

    #[inline(always)]
    pub const fn contains(self, color: Color) -> bool {
        return self.0 & color.0 != 0;
    }

    #[inline(always)]
    pub const fn intersects(self, other: ColorSet) -> bool {
        return self.0 & other.0 != 0;
    }

    #[inline(always)]
    pub const fn is_subset(self, other: ColorSet) -> bool {
        return self.0 & other.0 == self.0;
    }

    #[inline(always)]
    pub const fn union(self, other: ColorSet) -> ColorSet {
        return ColorSet(self.0 | other.0);
    }

    #[inline(always)]
    pub const fn is_empty(self) -> bool {
        return self.0 == 0;
    }

    /// Number of colors in the set.
    pub const fn len(self) -> usize {
        return self.0.count_ones() as usize;
    }

    /// Decomposes the set into single colors, lowest bit first.
    pub fn iter(self) -> impl Iterator<Item = Color> {
        let bits = self.0;
        return (0..MAX_COLORS)
            .filter(move |i| bits & (1 << i) != 0)
            .map(|i| Color(1 << i));
    }
}

impl fmt::Debug for ColorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "ColorSet({:#09b})", self.0);
    }
}

impl From<Color> for ColorSet {
    fn from(color: Color) -> ColorSet {
        return ColorSet(color.0);
    }
}

impl BitOr for Color {
    type Output = ColorSet;

    fn bitor(self, rhs: Color) -> ColorSet {
        return ColorSet(self.0 | rhs.0);
    }
}

impl BitOr<Color> for ColorSet {
    type Output = ColorSet;

    fn bitor(self, rhs: Color) -> ColorSet {
        return ColorSet(self.0 | rhs.0);
    }
}

impl BitOr for ColorSet {
    type Output = ColorSet;

    fn bitor(self, rhs: ColorSet) -> ColorSet {
        return self.union(rhs);
    }
}

impl FromIterator<Color> for ColorSet {
    fn from_iter<I: IntoIterator<Item = Color>>(iter: I) -> ColorSet {
        return iter.into_iter().fold(ColorSet::EMPTY, |set, color| set | color);
    }
}

/// Bijection between symbolic color names and single-bit colors.
///
/// The coder is fixed once built. Trees take ownership of one at construction,
/// so every tree carries the names its colors were registered under.
#[derive(Clone, Debug)]
pub struct ColorCoder {
    /// Names in registration order; the i-th name owns bit i.
    names: Vec<String>,
    lookup: FxHashMap<String, Color>,
}

impl ColorCoder {
    /// Registers `names`, giving the i-th name the color `1 << i`.
    pub fn new<I, S>(names: I) -> Result<ColorCoder>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() > MAX_COLORS {
            return Err(Error::TooManyColors { count: names.len(), max: MAX_COLORS });
        }

        let mut lookup = FxHashMap::default();
        for (i, name) in names.iter().enumerate() {
            // i < MAX_COLORS, checked above
            let color = Color(1 << i);
            if lookup.insert(name.clone(), color).is_some() {
                return Err(Error::DuplicateColor(name.clone()));
            }
        }

        return Ok(ColorCoder { names, lookup });
    }

    /// Number of registered colors.
    pub fn len(&self) -> usize {
        return self.names.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.names.is_empty();
    }

    pub fn names(&self) -> &[String] {
        return &self.names;
    }

    /// Union of every registered color.
    pub fn all(&self) -> ColorSet {
        return ColorSet(((1u16 << self.names.len()) - 1) as u8);
    }

    /// True if `color` was registered with this coder.
    pub fn is_registered(&self, color: Color) -> bool {
        return self.all().contains(color);
    }

    pub fn color_to_byte(&self, name: &str) -> Result<Color> {
        return self
            .lookup
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownColor(name.to_string()));
    }

    /// Name of the color occupying `bits`.
    pub fn byte_to_color(&self, bits: u8) -> Result<&str> {
        let color = Color::from_bits(bits).ok_or(Error::InvalidColor(bits))?;
        return self.name(color);
    }

    /// Name of a registered color.
    pub fn name(&self, color: Color) -> Result<&str> {
        return self
            .names
            .get(color.index())
            .map(String::as_str)
            .ok_or(Error::InvalidColor(color.bits()));
    }

    pub fn colors_to_byte<I, S>(&self, names: I) -> Result<ColorSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = ColorSet::EMPTY;
        for name in names {
            set = set | self.color_to_byte(name.as_ref())?;
        }
        return Ok(set);
    }

    /// Names of the registered colors in `set`, in registration order.
    /// Bits that were never registered are ignored.
    pub fn byte_to_colors(&self, set: ColorSet) -> SmallVec<[&str; MAX_COLORS]> {
        return set
            .iter()
            .filter_map(|color| self.names.get(color.index()))
            .map(String::as_str)
            .collect();
    }
}

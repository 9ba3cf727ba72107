use std::{fmt, ops::Index};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap as _,
};

use crate::{MAX_BOARD_DIMENSION, ShapeError};

/// The built-in shapes, one fixed orientation each.
const BUILTIN_SHAPES: &[(&str, &[(usize, usize)])] = &[
    ("1x1-square", &[(0, 0)]),
    ("1x2-line", &[(0, 0), (0, 1)]),
    ("2x1-line", &[(0, 0), (1, 0)]),
    ("1x3-line", &[(0, 0), (0, 1), (0, 2)]),
    ("3x1-line", &[(0, 0), (1, 0), (2, 0)]),
    ("1x4-line", &[(0, 0), (0, 1), (0, 2), (0, 3)]),
    ("4x1-line", &[(0, 0), (1, 0), (2, 0), (3, 0)]),
    ("1x5-line", &[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]),
    ("5x1-line", &[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)]),
    ("2x2-square", &[(0, 0), (0, 1), (1, 0), (1, 1)]),
    ("2x3-rect", &[(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]),
    ("3x2-rect", &[(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]),
    (
        "3x3-square",
        &[
            (0, 0),
            (0, 1),
            (0, 2),
            (1, 0),
            (1, 1),
            (1, 2),
            (2, 0),
            (2, 1),
            (2, 2),
        ],
    ),
    ("2x2-L-tl", &[(0, 0), (0, 1), (1, 0)]),
    ("2x2-L-tr", &[(0, 0), (0, 1), (1, 1)]),
    ("2x2-L-bl", &[(0, 0), (1, 0), (1, 1)]),
    ("2x2-L-br", &[(0, 1), (1, 0), (1, 1)]),
    ("2x3-L-tl", &[(0, 0), (0, 1), (0, 2), (1, 0)]),
    ("2x3-L-tr", &[(0, 0), (0, 1), (0, 2), (1, 2)]),
    ("2x3-L-bl", &[(0, 0), (1, 0), (1, 1), (1, 2)]),
    ("2x3-L-br", &[(0, 2), (1, 0), (1, 1), (1, 2)]),
    ("3x2-L-tl", &[(0, 0), (0, 1), (1, 0), (2, 0)]),
    ("3x2-L-tr", &[(0, 1), (1, 1), (2, 0), (2, 1)]),
    ("3x2-L-bl", &[(0, 0), (1, 0), (2, 0), (2, 1)]),
    ("3x2-L-br", &[(0, 0), (0, 1), (1, 1), (2, 1)]),
    ("3x3-L-tl", &[(0, 0), (0, 1), (0, 2), (1, 0), (2, 0)]),
    ("3x3-L-tr", &[(0, 0), (0, 1), (0, 2), (1, 2), (2, 2)]),
    ("3x3-L-bl", &[(0, 0), (1, 0), (2, 0), (2, 1), (2, 2)]),
    ("3x3-L-br", &[(0, 2), (1, 2), (2, 0), (2, 1), (2, 2)]),
    ("2x3-S", &[(0, 1), (0, 2), (1, 0), (1, 1)]),
    ("3x2-S", &[(0, 0), (1, 0), (1, 1), (2, 1)]),
    ("2x3-Z", &[(0, 0), (0, 1), (1, 1), (1, 2)]),
    ("3x2-Z", &[(0, 1), (1, 0), (1, 1), (2, 0)]),
    ("2x3-T", &[(0, 1), (1, 0), (1, 1), (1, 2)]),
    ("2x3-T-U", &[(0, 0), (0, 1), (0, 2), (1, 1)]),
    ("3x2-T-C", &[(0, 0), (1, 0), (1, 1), (2, 0)]),
    ("3x2-T-CC", &[(0, 1), (1, 0), (1, 1), (2, 1)]),
    ("3x3-Diag", &[(0, 0), (1, 1), (2, 2)]),
    ("3x3-Diag-b", &[(0, 2), (1, 1), (2, 0)]),
    ("2x2-Diag", &[(0, 0), (1, 1)]),
    ("2x2-Diag-b", &[(0, 1), (1, 0)]),
];

/// A named, immutable set of cell offsets relative to the shape origin.
///
/// Offsets are `(row, col)` pairs and never negative. The shape is placed by
/// anchoring its origin at a board cell; no rotation is ever applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    name: String,
    offsets: Vec<(usize, usize)>,
    height: usize,
    width: usize,
    // One bitmask per shape row, bit `c` set when offset column `c` is filled.
    row_masks: Vec<u64>,
}

impl Shape {
    pub fn new<I>(name: impl Into<String>, offsets: I) -> Result<Self, ShapeError>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let name = name.into();
        let offsets: Vec<_> = offsets.into_iter().collect();
        if offsets.is_empty() {
            return Err(ShapeError::EmptyShape { name });
        }
        let height = offsets.iter().map(|(r, _)| r + 1).max().unwrap_or(0);
        let width = offsets.iter().map(|(_, c)| c + 1).max().unwrap_or(0);
        if height > MAX_BOARD_DIMENSION || width > MAX_BOARD_DIMENSION {
            return Err(ShapeError::TooLarge { name });
        }

        let mut row_masks = vec![0; height];
        for (r, c) in &offsets {
            row_masks[*r] |= 1 << c;
        }

        Ok(Self {
            name,
            offsets,
            height,
            width,
            row_masks,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn offsets(&self) -> &[(usize, usize)] {
        &self.offsets
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.row_masks
            .iter()
            .map(|mask| mask.count_ones() as usize)
            .sum()
    }

    pub(crate) fn row_masks(&self) -> &[u64] {
        &self.row_masks
    }
}

/// Index of a shape inside a [`ShapeCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(usize);

impl ShapeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Ordered collection of uniquely-named shapes.
///
/// Catalog order is significant: every search that has to break a tie
/// "by catalog order" walks shapes in the order they were added here.
///
/// Serialized as a JSON object mapping shape names to offset lists, with
/// entry order preserved on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeCatalog {
    shapes: Vec<Shape>,
}

impl ShapeCatalog {
    pub fn new<I>(shapes: I) -> Result<Self, ShapeError>
    where
        I: IntoIterator<Item = Shape>,
    {
        let mut catalog = Self { shapes: vec![] };
        for shape in shapes {
            if catalog.id_of(shape.name()).is_some() {
                return Err(ShapeError::DuplicateName {
                    name: shape.name().to_owned(),
                });
            }
            catalog.shapes.push(shape);
        }
        if catalog.shapes.is_empty() {
            return Err(ShapeError::EmptyCatalog);
        }
        Ok(catalog)
    }

    /// The built-in 41-shape catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let shapes = BUILTIN_SHAPES.iter().map(|(name, offsets)| {
            Shape::new(*name, offsets.iter().copied()).expect("builtin shapes are valid")
        });
        Self::new(shapes).expect("builtin shape names are unique")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Returns the shape for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this catalog.
    #[must_use]
    pub fn get(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.0]
    }

    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<ShapeId> {
        self.shapes
            .iter()
            .position(|shape| shape.name() == name)
            .map(ShapeId)
    }

    pub fn require(&self, name: &str) -> Result<ShapeId, ShapeError> {
        self.id_of(name).ok_or_else(|| ShapeError::UnknownShape {
            name: name.to_owned(),
        })
    }

    #[must_use]
    pub fn shape_by_name(&self, name: &str) -> Option<&Shape> {
        self.id_of(name).map(|id| self.get(id))
    }

    #[must_use]
    pub fn name(&self, id: ShapeId) -> &str {
        self.get(id).name()
    }

    pub fn ids(&self) -> impl Iterator<Item = ShapeId> + use<> {
        (0..self.shapes.len()).map(ShapeId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &Shape)> + '_ {
        self.shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| (ShapeId(i), shape))
    }
}

impl Default for ShapeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Index<ShapeId> for ShapeCatalog {
    type Output = Shape;

    fn index(&self, id: ShapeId) -> &Shape {
        self.get(id)
    }
}

impl Serialize for ShapeCatalog {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.shapes.len()))?;
        for shape in &self.shapes {
            map.serialize_entry(shape.name(), shape.offsets())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ShapeCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = ShapeCatalog;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of shape names to (row, col) offset lists")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut shapes = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, offsets)) =
                    access.next_entry::<String, Vec<(usize, usize)>>()?
                {
                    shapes.push(Shape::new(name, offsets).map_err(serde::de::Error::custom)?);
                }
                ShapeCatalog::new(shapes).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CellValue – a single cell of an uploaded or fetched table
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell mirroring common dataframe dtypes.
/// Join keys are hashed and sorted, so `CellValue` must be `Ord + Hash`.
/// Equality is the total order's: floats compare with `total_cmp`, so
/// `NaN` equals itself and `0.0` differs from `-0.0`.
#[derive(Debug, Clone)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
    /// ISO-8601 date kept as text.
    Date(String),
    Null,
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) | CellValue::Date(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Inequality as a dataframe `!=` sees it: integers and floats compare
    /// by numeric value, and a missing cell differs from everything,
    /// another missing cell included.
    pub fn differs_from(&self, other: &CellValue) -> bool {
        match (self, other) {
            (CellValue::Null, _) | (_, CellValue::Null) => true,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a != b,
                _ => self != other,
            },
        }
    }

    /// Canonical form for join keys: integral floats become integers (which
    /// folds `-0.0` into `0`) and `NaN` becomes `Null`, so keys match by
    /// numeric value.
    pub fn join_key(&self) -> CellValue {
        match self {
            CellValue::Float(v) if v.is_nan() => CellValue::Null,
            CellValue::Float(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
            {
                CellValue::Integer(*v as i64)
            }
            other => other.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry – boundaries, bounds and centroids
// ---------------------------------------------------------------------------

/// A `[lon, lat]` coordinate pair.
pub type Position = [f64; 2];

/// One polygon: an exterior ring followed by zero or more holes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<Position>,
    pub holes: Vec<Vec<Position>>,
}

/// Boundary of a division. A plain polygon is a one-element boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boundary {
    pub polygons: Vec<Polygon>,
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    fn from_point([lon, lat]: Position) -> Self {
        Bounds {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        }
    }

    fn extend(&mut self, [lon, lat]: Position) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    pub fn center(&self) -> Position {
        [
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        ]
    }

    pub fn padded(&self, padding: f64) -> Bounds {
        Bounds {
            min_lon: self.min_lon - padding,
            min_lat: self.min_lat - padding,
            max_lon: self.max_lon + padding,
            max_lat: self.max_lat + padding,
        }
    }

    /// Width times height, in square degrees.
    pub fn area(&self) -> f64 {
        (self.max_lon - self.min_lon) * (self.max_lat - self.min_lat)
    }
}

/// Twice the signed area of `abc`; positive for a counter-clockwise turn.
fn cross(a: Position, b: Position, c: Position) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn in_triangle(p: Position, [a, b, c]: [Position; 3]) -> bool {
    cross(a, b, p) >= 0.0 && cross(b, c, p) >= 0.0 && cross(c, a, p) >= 0.0
}

impl Polygon {
    fn rings(&self) -> impl Iterator<Item = &Vec<Position>> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    /// Signed shoelace area of a ring.
    fn ring_area(ring: &[Position]) -> f64 {
        ring.iter()
            .zip(ring.iter().cycle().skip(1))
            .map(|(a, b)| a[0] * b[1] - b[0] * a[1])
            .sum::<f64>()
            / 2.0
    }

    /// Ear-clipping triangulation of the exterior ring. Holes are not cut
    /// out. A ring that stops yielding ears (self-intersecting input) is
    /// finished as a fan.
    pub fn triangulate(&self) -> Vec<[Position; 3]> {
        let mut ring = self.exterior.clone();
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return Vec::new();
        }
        if Polygon::ring_area(&ring) < 0.0 {
            ring.reverse();
        }

        let mut remaining: Vec<usize> = (0..ring.len()).collect();
        let mut triangles = Vec::with_capacity(ring.len() - 2);
        while remaining.len() > 3 {
            let n = remaining.len();
            let ear = (0..n).find_map(|i| {
                let corner = [
                    ring[remaining[(i + n - 1) % n]],
                    ring[remaining[i]],
                    ring[remaining[(i + 1) % n]],
                ];
                let turn = cross(corner[0], corner[1], corner[2]);
                if turn == 0.0 {
                    // Collinear vertex: drop it without a triangle.
                    return Some((i, None));
                }
                if turn < 0.0 {
                    return None;
                }
                let blocked = remaining.iter().any(|&j| {
                    let p = ring[j];
                    !corner.contains(&p) && in_triangle(p, corner)
                });
                (!blocked).then_some((i, Some(corner)))
            });
            let Some((i, corner)) = ear else {
                break;
            };
            triangles.extend(corner);
            remaining.remove(i);
        }
        if let Some((&first, rest)) = remaining.split_first() {
            for pair in rest.windows(2) {
                triangles.push([ring[first], ring[pair[0]], ring[pair[1]]]);
            }
        }
        triangles
    }

    /// Even-odd ray cast against every ring.
    pub fn contains(&self, [x, y]: Position) -> bool {
        let mut inside = false;
        for ring in self.rings() {
            let n = ring.len();
            if n < 3 {
                continue;
            }
            let mut j = n - 1;
            for i in 0..n {
                let [xi, yi] = ring[i];
                let [xj, yj] = ring[j];
                if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                    inside = !inside;
                }
                j = i;
            }
        }
        inside
    }
}

impl Boundary {
    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(|p| p.exterior.is_empty())
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut points = self
            .polygons
            .iter()
            .flat_map(|p| p.exterior.iter().copied());
        let mut bounds = Bounds::from_point(points.next()?);
        for point in points {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Area-weighted centroid of the exterior rings; falls back to the
    /// bounding-box centre for degenerate (zero-area) shapes.
    pub fn centroid(&self) -> Option<Position> {
        let mut area_sum = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for polygon in &self.polygons {
            let ring = &polygon.exterior;
            let area = Polygon::ring_area(ring);
            if area == 0.0 {
                continue;
            }
            let (mut sx, mut sy) = (0.0, 0.0);
            for (a, b) in ring.iter().zip(ring.iter().cycle().skip(1)) {
                let cross = a[0] * b[1] - b[0] * a[1];
                sx += (a[0] + b[0]) * cross;
                sy += (a[1] + b[1]) * cross;
            }
            // Normalise ring orientation so mixed windings add up.
            let sign = area.signum();
            cx += sign * sx / 6.0;
            cy += sign * sy / 6.0;
            area_sum += area.abs();
        }
        if area_sum == 0.0 {
            return self.bounds().map(|b| b.center());
        }
        Some([cx / area_sum, cy / area_sum])
    }

    pub fn contains(&self, point: Position) -> bool {
        self.polygons.iter().any(|p| p.contains(point))
    }

    /// Fill triangles of every polygon.
    pub fn triangulate(&self) -> Vec<[Position; 3]> {
        self.polygons.iter().flat_map(Polygon::triangulate).collect()
    }
}

// ---------------------------------------------------------------------------
// RegionRecord / RegionTotal – one row of the boundary dataset
// ---------------------------------------------------------------------------

/// One administrative division.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRecord {
    pub name: String,
    pub parent_region: Option<String>,
    pub total: u64,
    pub male: u64,
    pub female: u64,
    pub geometry: Boundary,
}

impl RegionRecord {
    /// Male per 100 female, 0 when there are no females.
    pub fn gender_ratio(&self) -> f64 {
        ratio_per_hundred(self.male, self.female)
    }

    pub fn male_percent(&self) -> f64 {
        percent(self.male, self.total)
    }

    pub fn female_percent(&self) -> f64 {
        percent(self.female, self.total)
    }
}

/// Official roll-up totals for a parent region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionTotal {
    pub parent_region: String,
    pub total: u64,
    pub male: u64,
    pub female: u64,
}

pub(crate) fn ratio_per_hundred(male: u64, female: u64) -> f64 {
    if female == 0 {
        0.0
    } else {
        male as f64 / female as f64 * 100.0
    }
}

pub(crate) fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// DivisionDataset – the complete loaded boundary dataset
// ---------------------------------------------------------------------------

/// Divisions and roll-up rows split apart at load time.
#[derive(Debug, Clone, Default)]
pub struct DivisionDataset {
    pub divisions: Vec<RegionRecord>,
    pub region_totals: Vec<RegionTotal>,
    pub source: PathBuf,
}

impl DivisionDataset {
    pub fn new(divisions: Vec<RegionRecord>, region_totals: Vec<RegionTotal>) -> Self {
        DivisionDataset {
            divisions,
            region_totals,
            source: PathBuf::new(),
        }
    }

    /// Number of divisions.
    pub fn len(&self) -> usize {
        self.divisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.divisions.is_empty()
    }

    /// Sorted distinct parent regions of the divisions.
    pub fn parent_regions(&self) -> Vec<String> {
        self.divisions
            .iter()
            .filter_map(|r| r.parent_region.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted division names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.divisions.iter().map(|r| r.name.clone()).collect();
        names.sort();
        names
    }

    pub fn official_total(&self, parent_region: &str) -> Option<&RegionTotal> {
        self.region_totals
            .iter()
            .find(|t| t.parent_region == parent_region)
    }

    /// `(min, max)` of the division totals.
    pub fn total_range(&self) -> Option<(u64, u64)> {
        let min = self.divisions.iter().map(|r| r.total).min()?;
        let max = self.divisions.iter().map(|r| r.total).max()?;
        Some((min, max))
    }

    pub fn grand_total(&self) -> u64 {
        self.divisions
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.total))
    }
}

/// Union of the bounds of every record's boundary.
pub fn total_bounds<'a, I>(records: I) -> Option<Bounds>
where
    I: IntoIterator<Item = &'a RegionRecord>,
{
    records
        .into_iter()
        .filter_map(|r| r.geometry.bounds())
        .reduce(Bounds::union)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon {
        Polygon {
            exterior: vec![
                [x0, y0],
                [x0 + size, y0],
                [x0 + size, y0 + size],
                [x0, y0 + size],
                [x0, y0],
            ],
            holes: Vec::new(),
        }
    }

    #[test]
    fn square_bounds_and_centroid() {
        let boundary = Boundary {
            polygons: vec![square(1.0, 6.0, 2.0)],
        };
        let bounds = boundary.bounds().unwrap();
        assert_eq!(bounds.min_lon, 1.0);
        assert_eq!(bounds.max_lat, 8.0);
        assert_relative_eq!(bounds.area(), 4.0);

        let [cx, cy] = boundary.centroid().unwrap();
        assert_relative_eq!(cx, 2.0, epsilon = 1e-9);
        assert_relative_eq!(cy, 7.0, epsilon = 1e-9);
    }

    #[test]
    fn multipolygon_centroid_is_area_weighted() {
        let boundary = Boundary {
            polygons: vec![square(0.0, 0.0, 2.0), square(10.0, 0.0, 1.0)],
        };
        let [cx, _] = boundary.centroid().unwrap();
        // (4 * 1 + 1 * 10.5) / 5
        assert_relative_eq!(cx, 2.9, epsilon = 1e-9);
    }

    #[test]
    fn hole_is_outside() {
        let mut polygon = square(0.0, 0.0, 4.0);
        polygon.holes.push(square(1.0, 1.0, 2.0).exterior);
        assert!(polygon.contains([0.5, 0.5]));
        assert!(!polygon.contains([2.0, 2.0]));
        assert!(!polygon.contains([5.0, 2.0]));
    }

    fn triangle_area([a, b, c]: [Position; 3]) -> f64 {
        cross(a, b, c).abs() / 2.0
    }

    #[test]
    fn concave_ring_triangulates_to_its_area() {
        // An L shape: 3x3 square minus its top-right 2x2 corner.
        let polygon = Polygon {
            exterior: vec![
                [0.0, 0.0],
                [3.0, 0.0],
                [3.0, 1.0],
                [1.0, 1.0],
                [1.0, 3.0],
                [0.0, 3.0],
                [0.0, 0.0],
            ],
            holes: Vec::new(),
        };
        let triangles = polygon.triangulate();
        assert_eq!(triangles.len(), 4);
        let area: f64 = triangles.iter().copied().map(triangle_area).sum();
        assert_relative_eq!(area, 5.0, epsilon = 1e-9);
        // No triangle covers the missing corner.
        for t in &triangles {
            assert!(!in_triangle([2.0, 2.0], *t));
        }
    }

    #[test]
    fn clockwise_ring_with_collinear_point() {
        let polygon = Polygon {
            exterior: vec![[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 1.0], [2.0, 0.0]],
            holes: Vec::new(),
        };
        let triangles = polygon.triangulate();
        assert!(triangles.iter().all(|&t| {
            let [a, b, c] = t;
            cross(a, b, c) >= 0.0
        }));
        let area: f64 = triangles.iter().copied().map(triangle_area).sum();
        assert_relative_eq!(area, 4.0, epsilon = 1e-9);
        assert!(Polygon::default().triangulate().is_empty());
    }

    #[test]
    fn numeric_cells_compare_by_value() {
        assert!(!CellValue::Integer(5).differs_from(&CellValue::Float(5.0)));
        assert!(CellValue::Integer(5).differs_from(&CellValue::Integer(7)));
        assert!(CellValue::from("up").differs_from(&CellValue::from("down")));
        assert!(CellValue::Null.differs_from(&CellValue::Null));
        assert!(CellValue::Null.differs_from(&CellValue::from("up")));
        assert!(CellValue::Float(f64::NAN).differs_from(&CellValue::Float(f64::NAN)));
    }

    #[test]
    fn equality_agrees_with_hash() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        fn hash(v: &CellValue) -> u64 {
            let mut h = DefaultHasher::new();
            v.hash(&mut h);
            h.finish()
        }

        let nan = CellValue::Float(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(hash(&nan), hash(&nan.clone()));
        assert_ne!(CellValue::Float(0.0), CellValue::Float(-0.0));
    }

    #[test]
    fn join_keys_are_numeric() {
        assert_eq!(CellValue::Float(5.0).join_key(), CellValue::Integer(5));
        assert_eq!(CellValue::Float(-0.0).join_key(), CellValue::Integer(0));
        assert_eq!(CellValue::Float(2.5).join_key(), CellValue::Float(2.5));
        assert_eq!(CellValue::Float(f64::NAN).join_key(), CellValue::Null);
        assert_eq!(CellValue::from("X").join_key(), CellValue::from("X"));
    }

    #[test]
    fn empty_boundary_has_no_bounds() {
        assert!(Boundary::default().bounds().is_none());
        assert!(Boundary::default().centroid().is_none());
    }
}

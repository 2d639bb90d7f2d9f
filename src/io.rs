//! Reading and writing sampled spatio-temporal traces.
//!
//! Traces are stored as text. The first line declares the number of locations, and every other
//! line holds a sample time followed by the values of every location at that time, separated by
//! semicolons:
//!
//! ```text
//! LOCATIONS 3
//! 0.0;1.0;1.0;1.0
//! 1.0;2.0;3.0;4.0
//! ```
//!
//! When a row holds more than one value per location the values are grouped by location, so a row
//! for 2 locations and 2 variables reads `time;x0;y0;x1;y1`. Whitespace around fields is ignored
//! when reading and never produced when writing, and values are written using the shortest
//! representation that parses back to the same number, so reading a trace written by this module
//! and writing it again reproduces the original text exactly.
//!
//! ```rust
//! use banquo_spatial::io::SampledTrace;
//!
//! let text = "LOCATIONS 2\n0.0;1.0;-1.0\n0.5;2.0;-2.0\n";
//! let trace = SampledTrace::from_str(text).unwrap();
//!
//! assert_eq!(trace.locations(), 2);
//! assert_eq!(trace.to_string().unwrap(), text);
//! ```
//!
//! Location services use the same header followed by declarations and edge rows. `DIRECTED` or
//! `UNDIRECTED` selects how the edges after it are added, and edges are undirected unless stated
//! otherwise. A `STATIC` declaration introduces a model holding at every time, while each `TIME t`
//! declaration introduces a model holding from `t` until the next declaration. Edge rows hold the
//! source and target locations followed by the values labelling the edge:
//!
//! ```rust
//! use banquo_spatial::io::locations_from_str;
//! use banquo_spatial::space::SpatialModel;
//!
//! let text = "LOCATIONS 3\nDIRECTED\nTIME 0.0\n0;1;1.5\nTIME 2.0\n0;1;1.5\n1;2;0.5\n";
//! let service = locations_from_str(text).unwrap();
//!
//! assert!(service.model_at(1.0).unwrap().edge(1, 2).is_none());
//! assert_eq!(service.model_at(2.0).unwrap().edge(1, 2), Some(&vec![0.5]));
//! ```

use std::io::{Read, Write};

use csv::{ReaderBuilder, StringRecord, Terminator, Trim, WriterBuilder};
use thiserror::Error;

use crate::cursor::ParallelCursor;
use crate::signal::{SignalError, SpatialTemporalSignal};
use crate::space::{GraphModel, LocationService, SpaceError};

const HEADER: &str = "LOCATIONS";

#[derive(Debug, Error)]
pub enum TraceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("Trace does not start with a \"LOCATIONS n\" header")]
    MissingHeader,

    #[error("Malformed header \"{0}\"")]
    MalformedHeader(String),

    #[error("Could not parse \"{field}\" on line {line}")]
    Parse { line: u64, field: String },

    #[error("Line {line} holds {found} values, expected a multiple of {locations}")]
    ShortRow {
        line: u64,
        locations: usize,
        found: usize,
    },

    #[error("Time {time} on line {line} does not come after previous time {previous}")]
    NonMonotonic { line: u64, previous: f64, time: f64 },

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error("Unknown declaration \"{text}\" on line {line}")]
    MalformedDeclaration { line: u64, text: String },

    #[error("Edge on line {line} does not follow a STATIC or TIME declaration")]
    MissingDeclaration { line: u64 },

    #[error("Location service does not declare any model")]
    NoModels,

    #[error("Location {location} on line {line} is out of range for {locations} locations")]
    LocationOutOfRange {
        line: u64,
        location: usize,
        locations: usize,
    },

    #[error("Edge on line {line} holds {found} values, expected {expected}")]
    EdgeValues {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Space(#[from] SpaceError),
}

/// Rows of samples for every location of a spatial model.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledTrace {
    locations: usize,
    rows: Vec<(f64, Vec<f64>)>,
}

fn parse_header(record: &StringRecord) -> Result<usize, TraceError> {
    let text = record.iter().collect::<Vec<_>>().join(";");
    let mut words = text.split_whitespace();

    match (words.next(), words.next(), words.next()) {
        (Some(HEADER), Some(count), None) => count
            .parse()
            .map_err(|_| TraceError::MalformedHeader(text.clone())),
        _ => Err(TraceError::MalformedHeader(text)),
    }
}

fn parse_field(field: &str, line: u64) -> Result<f64, TraceError> {
    field.parse().map_err(|_| TraceError::Parse {
        line,
        field: field.to_string(),
    })
}

impl SampledTrace {
    /// Create an empty trace for the given number of locations.
    pub fn new(locations: usize) -> Self {
        Self {
            locations,
            rows: Vec::new(),
        }
    }

    pub fn locations(&self) -> usize {
        self.locations
    }

    pub fn rows(&self) -> &[(f64, Vec<f64>)] {
        &self.rows
    }

    /// Number of values stored for each location in every row.
    pub fn variables(&self) -> usize {
        match (self.rows.first(), self.locations) {
            (Some((_, values)), locations) if locations > 0 => values.len() / locations,
            _ => 0,
        }
    }

    /// Append a row, failing if its time does not come after the previous row or if it does not
    /// hold the same number of values for every location.
    pub fn push(&mut self, time: f64, values: Vec<f64>) -> Result<(), TraceError> {
        let line = self.rows.len() as u64 + 2;
        let expected = self.rows.first().map(|(_, first)| first.len());

        if self.locations == 0
            || values.len() % self.locations != 0
            || expected.map_or(false, |expected| expected != values.len())
        {
            return Err(TraceError::ShortRow {
                line,
                locations: self.locations,
                found: values.len(),
            });
        }

        if let Some((previous, _)) = self.rows.last() {
            if time <= *previous || time.is_nan() {
                return Err(TraceError::NonMonotonic {
                    line,
                    previous: *previous,
                    time,
                });
            }
        }

        self.rows.push((time, values));
        Ok(())
    }

    /// Read a trace, ignoring whitespace around fields.
    pub fn read<R: Read>(reader: R) -> Result<Self, TraceError> {
        let mut reader = csv_reader(reader);
        let mut records = reader.records();
        let header = records.next().ok_or(TraceError::MissingHeader)??;
        let mut trace = Self::new(parse_header(&header)?);

        for record in records {
            let record = record?;
            let line = record.position().map_or(0, |position| position.line());
            let mut fields = record.iter().map(|field| parse_field(field, line));

            let Some(time) = fields.next().transpose()? else {
                continue;
            };

            trace.push(time, fields.collect::<Result<Vec<_>, _>>()?)?;
        }

        tracing::debug!(
            locations = trace.locations,
            rows = trace.rows.len(),
            "Read sampled trace"
        );

        Ok(trace)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Self, TraceError> {
        Self::read(text.as_bytes())
    }

    /// Write the trace without any whitespace around fields.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), TraceError> {
        writeln!(writer, "{} {}", HEADER, self.locations)?;

        let mut writer = WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);

        for (time, values) in &self.rows {
            let fields = std::iter::once(time).chain(values).map(|value| format!("{:?}", value));
            writer.write_record(fields)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn to_string(&self) -> Result<String, TraceError> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;

        // Every field is produced by formatting a number.
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Convert the trace into a signal holding the values of every variable for each location.
    pub fn to_signal(&self) -> Result<SpatialTemporalSignal<Vec<f64>>, TraceError> {
        let variables = self.variables();

        let rows = self.rows.iter().map(|(time, values)| {
            let states = values
                .chunks(variables.max(1))
                .map(<[f64]>::to_vec)
                .collect::<Vec<_>>();

            (*time, states)
        });

        Ok(SpatialTemporalSignal::from_samples(self.locations, rows)?)
    }

    /// Sample a signal at every time where the value of any location changes, and at its end.
    pub fn from_signal(signal: &SpatialTemporalSignal<f64>) -> Self {
        let mut trace = Self::new(signal.locations());

        let Some(mut cursor) = ParallelCursor::new(signal.signals()) else {
            return trace;
        };

        loop {
            trace.rows.push((cursor.time(), cursor.values().copied().collect()));

            if !cursor.synchronize() {
                break;
            }
        }

        if cursor.end() > cursor.time() && cursor.move_to(cursor.end()) {
            trace.rows.push((cursor.time(), cursor.values().copied().collect()));
        }

        trace
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader)
}

enum Declaration {
    Directed(bool),
    Static,
    Time(f64),
}

fn parse_declaration(text: &str, line: u64) -> Result<Declaration, TraceError> {
    let mut words = text.split_whitespace();

    let declaration = match (words.next(), words.next(), words.next()) {
        (Some("DIRECTED"), None, None) => Some(Declaration::Directed(true)),
        (Some("UNDIRECTED"), None, None) => Some(Declaration::Directed(false)),
        (Some("STATIC"), None, None) => Some(Declaration::Static),
        (Some("TIME"), Some(time), None) => time.parse().ok().map(Declaration::Time),
        _ => None,
    };

    declaration.ok_or_else(|| TraceError::MalformedDeclaration {
        line,
        text: text.to_string(),
    })
}

fn parse_location(field: &str, line: u64, locations: usize) -> Result<usize, TraceError> {
    let location = field.parse().map_err(|_| TraceError::Parse {
        line,
        field: field.to_string(),
    })?;

    if location >= locations {
        return Err(TraceError::LocationOutOfRange {
            line,
            location,
            locations,
        });
    }

    Ok(location)
}

/// Location service under construction while reading.
struct LocationBuilder {
    locations: usize,
    directed: bool,
    values: Option<usize>,
    fixed: Option<GraphModel<Vec<f64>>>,
    current: Option<(f64, GraphModel<Vec<f64>>)>,
    service: LocationService<Vec<f64>>,
}

impl LocationBuilder {
    fn new(locations: usize) -> Self {
        Self {
            locations,
            directed: false,
            values: None,
            fixed: None,
            current: None,
            service: LocationService::new(),
        }
    }

    fn declare(&mut self, declaration: Declaration, line: u64) -> Result<(), TraceError> {
        let timed = self.current.is_some() || !self.service.is_empty();

        match declaration {
            Declaration::Directed(directed) => self.directed = directed,
            Declaration::Static if self.fixed.is_none() && !timed => {
                self.fixed = Some(GraphModel::new(self.locations));
            }
            Declaration::Time(time) if self.fixed.is_none() => {
                self.flush()?;
                self.current = Some((time, GraphModel::new(self.locations)));
            }
            Declaration::Static | Declaration::Time(_) => {
                return Err(TraceError::MalformedDeclaration {
                    line,
                    text: String::from("STATIC and TIME declarations cannot be mixed"),
                });
            }
        }

        Ok(())
    }

    fn edge(&mut self, record: &StringRecord, line: u64) -> Result<(), TraceError> {
        let from = parse_location(&record[0], line, self.locations)?;
        let to = parse_location(&record[1], line, self.locations)?;
        let values = record
            .iter()
            .skip(2)
            .map(|field| parse_field(field, line))
            .collect::<Result<Vec<_>, _>>()?;

        let expected = *self.values.get_or_insert(values.len());

        if values.len() != expected {
            return Err(TraceError::EdgeValues {
                line,
                expected,
                found: values.len(),
            });
        }

        let directed = self.directed;
        let model = match (&mut self.fixed, &mut self.current) {
            (Some(model), _) | (None, Some((_, model))) => model,
            (None, None) => return Err(TraceError::MissingDeclaration { line }),
        };

        if directed {
            model.add_edge(from, to, values)?;
        } else {
            model.add_undirected_edge(from, to, values)?;
        }

        Ok(())
    }

    fn flush(&mut self) -> Result<(), TraceError> {
        if let Some((time, model)) = self.current.take() {
            self.service.add(time, model)?;
        }

        Ok(())
    }

    fn finish(mut self) -> Result<LocationService<Vec<f64>>, TraceError> {
        if let Some(model) = self.fixed.take() {
            return Ok(LocationService::constant(model));
        }

        self.flush()?;

        if self.service.is_empty() {
            return Err(TraceError::NoModels);
        }

        Ok(self.service)
    }
}

/// Read a location service whose edges are labelled by numeric values.
///
/// Every edge row must hold the same number of values. Times of consecutive `TIME` declarations
/// must be strictly increasing.
pub fn read_locations<R: Read>(reader: R) -> Result<LocationService<Vec<f64>>, TraceError> {
    let mut reader = csv_reader(reader);
    let mut records = reader.records();
    let header = records.next().ok_or(TraceError::MissingHeader)??;
    let mut builder = LocationBuilder::new(parse_header(&header)?);

    for record in records {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());

        match record.len() {
            0 => continue,
            1 if record[0].is_empty() => continue,
            1 => builder.declare(parse_declaration(&record[0], line)?, line)?,
            _ => builder.edge(&record, line)?,
        }
    }

    tracing::debug!(
        locations = builder.locations,
        directed = builder.directed,
        "Read location service"
    );

    builder.finish()
}

pub fn locations_from_str(text: &str) -> Result<LocationService<Vec<f64>>, TraceError> {
    read_locations(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{locations_from_str, SampledTrace, TraceError};
    use crate::signal::SpatialTemporalSignal;
    use crate::space::SpatialModel;

    const TRACE: &str = "LOCATIONS 3\n0.0;1.0;1.0;1.0\n1.0;2.0;3.0;4.0\n2.0;4.0;9.0;16.0\n";

    #[test]
    fn round_trip() -> Result<(), Box<dyn Error>> {
        let trace = SampledTrace::from_str(TRACE)?;

        assert_eq!(trace.locations(), 3);
        assert_eq!(trace.rows().len(), 3);
        assert_eq!(trace.to_string()?, TRACE);

        Ok(())
    }

    #[test]
    fn whitespace_is_ignored() -> Result<(), Box<dyn Error>> {
        let spaced = "LOCATIONS 3\n0.0; 1.0; 1.0; 1.0\n1.0 ;2.0;3.0; 4.0\n2.0;4.0;9.0;16.0\n";
        let trace = SampledTrace::from_str(spaced)?;

        assert_eq!(trace.to_string()?, TRACE);

        Ok(())
    }

    #[test]
    fn signal_conversion() -> Result<(), Box<dyn Error>> {
        let signal = SampledTrace::from_str(TRACE)?.to_signal()?;

        assert_eq!(signal.locations(), 3);
        assert_eq!(signal.value_at(2, 1.5), Some(&vec![4.0]));
        assert_eq!(signal.value_at(1, 2.0), Some(&vec![9.0]));

        let values = SpatialTemporalSignal::from_samples(
            2,
            [(0.0, vec![1.0, 2.0]), (1.0, vec![1.0, 3.0]), (4.0, vec![1.0, 3.0])],
        )?;

        let trace = SampledTrace::from_signal(&values);
        assert_eq!(trace.to_string()?, "LOCATIONS 2\n0.0;1.0;2.0\n1.0;1.0;3.0\n4.0;1.0;3.0\n");

        Ok(())
    }

    #[test]
    fn malformed_input() {
        assert!(matches!(
            SampledTrace::from_str("POINTS 3\n0.0;1.0;1.0;1.0\n"),
            Err(TraceError::MalformedHeader(_))
        ));
        assert!(matches!(
            SampledTrace::from_str("LOCATIONS 3\n0.0;1.0;1.0\n"),
            Err(TraceError::ShortRow { found: 2, .. })
        ));
        assert!(matches!(
            SampledTrace::from_str("LOCATIONS 1\n0.0;1.0\n0.0;2.0\n"),
            Err(TraceError::NonMonotonic { line: 3, .. })
        ));
        assert!(matches!(
            SampledTrace::from_str("LOCATIONS 1\n0.0;x\n"),
            Err(TraceError::Parse { line: 2, .. })
        ));
        assert!(matches!(SampledTrace::from_str(""), Err(TraceError::MissingHeader)));
    }

    const GRAPH: &str = "LOCATIONS 3\nSTATIC\n0; 1; 1; 1.0\n1;2;2;2.0\n2;0;3;3.0\n";

    #[test]
    fn static_locations() -> Result<(), Box<dyn Error>> {
        let service = locations_from_str(GRAPH)?;
        let model = service.model_at(100.0).ok_or("missing model")?;

        assert_eq!(model.size(), 3);
        assert_eq!(model.edge(0, 1), Some(&vec![1.0, 1.0]));
        assert_eq!(model.edge(1, 0), Some(&vec![1.0, 1.0]));
        assert_eq!(model.edge(2, 1), Some(&vec![2.0, 2.0]));
        assert_eq!(model.edge(0, 2), Some(&vec![3.0, 3.0]));
        assert!(service.model_at(-100.0).is_some());

        Ok(())
    }

    #[test]
    fn directed_locations() -> Result<(), Box<dyn Error>> {
        let text = GRAPH.replace("STATIC", "DIRECTED\nSTATIC");
        let service = locations_from_str(&text)?;
        let model = service.model_at(0.0).ok_or("missing model")?;

        assert_eq!(model.edge(0, 1), Some(&vec![1.0, 1.0]));
        assert_eq!(model.edge(1, 0), None);
        assert_eq!(model.edge(2, 0), Some(&vec![3.0, 3.0]));
        assert_eq!(model.edge(0, 2), None);

        Ok(())
    }

    #[test]
    fn dynamic_locations() -> Result<(), Box<dyn Error>> {
        let text = "LOCATIONS 3\n\
                    TIME 0.0\n0;1;1.0\n\
                    TIME 1.0\n0;1;1.0\n1;2;2.0\n\
                    TIME 2.0\n0;1;1.0\n1;2;2.0\n2;0;3.0\n";
        let service = locations_from_str(text)?;

        let first = service.model_at(0.0).ok_or("missing model")?;
        assert_eq!(first.edge(0, 1), Some(&vec![1.0]));
        assert_eq!(first.edge(1, 2), None);

        let second = service.model_at(1.0).ok_or("missing model")?;
        assert_eq!(second.edge(2, 1), Some(&vec![2.0]));
        assert_eq!(second.edge(2, 0), None);

        let last = service.model_at(2.5).ok_or("missing model")?;
        assert_eq!(last.edge(2, 0), Some(&vec![3.0]));
        assert!(service.model_at(-1.0).is_none());
        assert_eq!(service.next_change(0.5), Some(1.0));

        Ok(())
    }

    #[test]
    fn malformed_locations() {
        assert!(matches!(
            locations_from_str("LOCATIONS 2\n0;1;1.0\n"),
            Err(TraceError::MissingDeclaration { line: 2 })
        ));
        assert!(matches!(
            locations_from_str("LOCATIONS 2\nSTATIC\n0;2;1.0\n"),
            Err(TraceError::LocationOutOfRange { line: 3, location: 2, .. })
        ));
        assert!(matches!(
            locations_from_str("LOCATIONS 2\nSTATIC\n0;1;1.0\n1;0;1.0;2.0\n"),
            Err(TraceError::EdgeValues { expected: 1, found: 2, .. })
        ));
        assert!(matches!(
            locations_from_str("LOCATIONS 2\nTIME 1.0\nTIME 0.5\n"),
            Err(TraceError::Space(_))
        ));
        assert!(matches!(
            locations_from_str("LOCATIONS 2\nTIME 0.0\nSTATIC\n"),
            Err(TraceError::MalformedDeclaration { line: 3, .. })
        ));
        assert!(matches!(
            locations_from_str("LOCATIONS 2\nTIME now\n"),
            Err(TraceError::MalformedDeclaration { line: 2, .. })
        ));
        assert!(matches!(locations_from_str("LOCATIONS 2\n"), Err(TraceError::NoModels)));
    }
}

//! Model persistence: the snapshot value, the writer/reader collaborator
//! traits, and a text-format implementation.
//!
//! The matrix block inside a persisted model is exactly the `Display` layout
//! of [`ParamMatrix`]: one header line `D C`, then one line per feature index
//! with all C coefficients in class order. The reader parses that block back
//! and asserts equality of dimensions, so writer and reader round-trip
//! against the same contract.
//!
//! Coefficients are written with Rust's shortest round-trip `f64` formatting,
//! so a write-parse cycle reproduces every entry bit for bit.
use crate::regression::{
    core::{model_type::Link, params::ParamMatrix},
    errors::{RegressionError, RegressionResult},
};
use std::io::{BufRead, Write};

const FORMAT_TAG: &str = "polytomous-model 1";

/// Everything needed to rebuild a trained model: topic, link function, the
/// original feature ids selected by the design, the intercept flag, the
/// tuned decision threshold, and the fitted coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    pub topic: String,
    pub link: Link,
    pub feat_select: Vec<usize>,
    pub add_intercept: bool,
    pub threshold: f64,
    pub beta: ParamMatrix,
}

impl ModelSnapshot {
    /// Number of selected features including the intercept; must equal the
    /// coefficient matrix's D.
    pub fn n_selected(&self) -> usize {
        self.feat_select.len() + usize::from(self.add_intercept)
    }
}

/// Opaque sink for persisted models. The training pipeline calls this; the
/// storage medium is the implementation's business.
pub trait WriteModel {
    fn write_model(&mut self, snapshot: &ModelSnapshot) -> RegressionResult<()>;
}

/// Opaque source for persisted models.
pub trait ReadModel {
    fn read_model(&mut self) -> RegressionResult<ModelSnapshot>;
}

/// Writes models in the line-oriented text format.
#[derive(Debug)]
pub struct TextModelWriter<W: Write> {
    out: W,
}

impl<W: Write> TextModelWriter<W> {
    pub fn new(out: W) -> Self {
        TextModelWriter { out }
    }

    /// Consume the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> WriteModel for TextModelWriter<W> {
    fn write_model(&mut self, snapshot: &ModelSnapshot) -> RegressionResult<()> {
        writeln!(self.out, "{FORMAT_TAG}")?;
        writeln!(self.out, "topic {}", snapshot.topic)?;
        let link = match snapshot.link {
            Link::Logistic => "logistic",
            Link::Multinomial => "multinomial",
        };
        writeln!(self.out, "link {link}")?;
        writeln!(self.out, "intercept {}", snapshot.add_intercept)?;
        writeln!(self.out, "threshold {}", snapshot.threshold)?;
        write!(self.out, "features {}", snapshot.feat_select.len())?;
        for id in &snapshot.feat_select {
            write!(self.out, " {id}")?;
        }
        writeln!(self.out)?;
        writeln!(self.out, "{}", snapshot.beta)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Reads models written by [`TextModelWriter`].
#[derive(Debug)]
pub struct TextModelReader<R: BufRead> {
    input: R,
    line: usize,
}

impl<R: BufRead> TextModelReader<R> {
    pub fn new(input: R) -> Self {
        TextModelReader { input, line: 0 }
    }

    fn next_line(&mut self) -> RegressionResult<String> {
        let mut buf = String::new();
        let n = self.input.read_line(&mut buf)?;
        self.line += 1;
        if n == 0 {
            return Err(self.parse_err("unexpected end of file"));
        }
        Ok(buf.trim_end_matches(['\n', '\r']).to_string())
    }

    fn parse_err(&self, message: &str) -> RegressionError {
        RegressionError::ModelParse { line: self.line, message: message.to_string() }
    }

    fn expect_field<'a>(&self, line: &'a str, key: &str) -> RegressionResult<&'a str> {
        line.strip_prefix(key)
            .and_then(|rest| rest.strip_prefix(' ').or(Some(rest).filter(|r| r.is_empty())))
            .ok_or_else(|| self.parse_err(&format!("expected '{key} ...'")))
    }
}

impl<R: BufRead> ReadModel for TextModelReader<R> {
    fn read_model(&mut self) -> RegressionResult<ModelSnapshot> {
        let tag = self.next_line()?;
        if tag != FORMAT_TAG {
            return Err(self.parse_err(&format!("unknown format tag '{tag}'")));
        }

        let line = self.next_line()?;
        let topic = self.expect_field(&line, "topic")?.to_string();

        let line = self.next_line()?;
        let link = match self.expect_field(&line, "link")? {
            "logistic" => Link::Logistic,
            "multinomial" => Link::Multinomial,
            other => return Err(self.parse_err(&format!("unknown link '{other}'"))),
        };

        let line = self.next_line()?;
        let add_intercept = self
            .expect_field(&line, "intercept")?
            .parse::<bool>()
            .map_err(|_| self.parse_err("intercept must be true or false"))?;

        let line = self.next_line()?;
        let threshold = self
            .expect_field(&line, "threshold")?
            .parse::<f64>()
            .map_err(|_| self.parse_err("threshold must be a number"))?;

        let line = self.next_line()?;
        let mut fields = self.expect_field(&line, "features")?.split_whitespace();
        let n_features: usize = fields
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| self.parse_err("features line must start with a count"))?;
        let feat_select: Vec<usize> = fields
            .map(|t| t.parse::<usize>())
            .collect::<Result<_, _>>()
            .map_err(|_| self.parse_err("feature ids must be integers"))?;
        if feat_select.len() != n_features {
            return Err(self.parse_err("feature count disagrees with the id list"));
        }

        // Matrix block: "D C" then one line per feature.
        let line = self.next_line()?;
        let mut dims = line.split_whitespace();
        let (d, c) = match (
            dims.next().and_then(|t| t.parse::<usize>().ok()),
            dims.next().and_then(|t| t.parse::<usize>().ok()),
        ) {
            (Some(d), Some(c)) if dims.next().is_none() => (d, c),
            _ => return Err(self.parse_err("matrix header must be 'D C'")),
        };
        let expected_d = feat_select.len() + usize::from(add_intercept);
        if d != expected_d {
            return Err(RegressionError::FeatureCountMismatch { expected: expected_d, actual: d });
        }

        let mut beta = ParamMatrix::dense(d, c, 0.0);
        for j in 0..d {
            let line = self.next_line()?;
            let mut fields = line.split_whitespace();
            match fields.next().and_then(|t| t.parse::<usize>().ok()) {
                Some(idx) if idx == j => {}
                _ => return Err(self.parse_err(&format!("expected row for feature {j}"))),
            }
            for k in 0..c {
                let value: f64 = fields
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| self.parse_err(&format!("row {j} needs {c} coefficients")))?;
                beta.set(j, k, value)?;
            }
            if fields.next().is_some() {
                return Err(self.parse_err(&format!("row {j} has more than {c} coefficients")));
            }
        }

        Ok(ModelSnapshot { topic, link, feat_select, add_intercept, threshold, beta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Write-then-read round trips of full snapshots, including every
    //   coefficient.
    // - Rejection of malformed headers and inconsistent dimension metadata.
    // -------------------------------------------------------------------------

    fn snapshot() -> ModelSnapshot {
        let mut beta = ParamMatrix::dense(3, 2, 0.0);
        beta.set(0, 0, 0.5).unwrap();
        beta.set(1, 1, -0.25).unwrap();
        beta.set(2, 0, 1e-7).unwrap();
        ModelSnapshot {
            topic: "earn".to_string(),
            link: Link::Logistic,
            feat_select: vec![4, 17],
            add_intercept: true,
            threshold: 0.75,
            beta,
        }
    }

    #[test]
    fn snapshots_round_trip_through_the_text_format() {
        // Arrange
        let original = snapshot();
        let mut writer = TextModelWriter::new(Vec::new());

        // Act
        writer.write_model(&original).unwrap();
        let bytes = writer.into_inner();
        let restored =
            TextModelReader::new(BufReader::new(bytes.as_slice())).read_model().unwrap();

        // Assert
        assert_eq!(restored, original);
        for j in 0..3 {
            for k in 0..2 {
                assert_eq!(restored.beta.get(j, k).unwrap(), original.beta.get(j, k).unwrap());
            }
        }
    }

    #[test]
    fn reader_rejects_an_unknown_format_tag() {
        let err = TextModelReader::new(BufReader::new(&b"not-a-model\n"[..]))
            .read_model()
            .unwrap_err();
        match err {
            RegressionError::ModelParse { line: 1, .. } => {}
            other => panic!("expected ModelParse at line 1, got {other:?}"),
        }
    }

    #[test]
    fn reader_rejects_a_matrix_that_disagrees_with_the_selection() {
        // Snapshot claims 2 selected features + intercept but a 2-row matrix.
        let text = "polytomous-model 1\n\
                    topic t\n\
                    link multinomial\n\
                    intercept true\n\
                    threshold 0\n\
                    features 2 1 2\n\
                    2 2\n\
                    0 0 0\n\
                    1 0 0\n";
        let err =
            TextModelReader::new(BufReader::new(text.as_bytes())).read_model().unwrap_err();
        assert_eq!(err, RegressionError::FeatureCountMismatch { expected: 3, actual: 2 });
    }
}

//! Text serialization and pretty printing of federations.
//!
//! # Serialized form
//!
//! Whitespace-separated integers: the member count, the dimension, then
//! every member's raw encoded bounds in row-major order. The writer puts
//! one matrix row per line; the reader accepts any whitespace.
//!
//! ```text
//! 2 2
//! 1 1
//! 5 1
//! 1 -3
//! 9 1
//! ```
//!
//! # Pretty printing
//!
//! Layout options are passed explicitly as a [`PrintFormat`] value.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use zonefed_algebra::FedList;
use zonefed_arena::DbmAllocator;
use zonefed_core::Raw;
use zonefed_dbm::close::is_valid;

use crate::error::FederationError;

/// Layout flavour for [`pretty_print`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrintStyle {
    /// `"<n> DBMs <dim>x<dim> {...}"`.
    #[default]
    Plain,
    /// `Fed(<dim>) {...}`, readable as a Ruby matrix literal.
    Ruby,
}

/// Pretty-printing options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PrintFormat {
    /// Written at the start of every matrix row.
    pub prefix: String,
    /// Layout flavour.
    pub style: PrintStyle,
}

impl PrintFormat {
    /// Plain layout, no prefix.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Ruby layout, no prefix.
    pub fn ruby() -> Self {
        Self {
            prefix: String::new(),
            style: PrintStyle::Ruby,
        }
    }

    /// Builder: set the row prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// Write `fed` in the serialized form.
pub fn write_fed(fed: &FedList, alloc: &DbmAllocator, out: &mut impl Write) -> io::Result<()> {
    let dim = fed.dim();
    writeln!(out, "{} {}", fed.len(), dim)?;
    for dbm in fed.iter(alloc) {
        for row in dbm.chunks(dim) {
            let mut first = true;
            for c in row {
                if !first {
                    out.write_all(b" ")?;
                }
                write!(out, "{}", c.encoded())?;
                first = false;
            }
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Replace the contents of `fed` with a federation read from `input`.
///
/// Existing members are released first. Each matrix must be closed and
/// non-empty. On error `fed` holds the members read so far and nothing
/// is leaked; the input is consumed up to the offending token.
pub fn read_fed(
    fed: &mut FedList,
    alloc: &mut DbmAllocator,
    input: &mut impl BufRead,
) -> Result<(), FederationError> {
    fed.release(alloc);
    let mut tokens = Tokens { input };
    let count: usize = tokens.parse("member count")?;
    let dim: usize = tokens.parse("dimension")?;
    if dim == 0 {
        return Err(FederationError::parse("dimension 0"));
    }
    if dim > alloc.max_dim() {
        return Err(FederationError::DimensionTooLarge {
            dim,
            max_dim: alloc.max_dim(),
        });
    }
    *fed = FedList::new(dim);

    let mut cells = vec![Raw::LE_ZERO; dim * dim];
    for k in 0..count {
        for (n, cell) in cells.iter_mut().enumerate() {
            let raw: i32 = tokens.parse(format_args!("bound {n} of matrix {k}"))?;
            *cell = Raw::from_encoded(raw);
        }
        if !is_valid(&cells, dim) {
            return Err(FederationError::parse(format!(
                "matrix {k} is not a closed non-empty zone"
            )));
        }
        fed.add_dbm(&cells, alloc)?;
    }
    Ok(())
}

/// Whitespace-separated tokens pulled from a buffered reader on demand.
struct Tokens<'a, R> {
    input: &'a mut R,
}

impl<R: BufRead> Tokens<'_, R> {
    fn next_token(&mut self) -> io::Result<Option<String>> {
        let mut token = Vec::new();
        loop {
            let buf = self.input.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let mut used = 0;
            let mut done = false;
            for &b in buf {
                used += 1;
                if b.is_ascii_whitespace() {
                    if !token.is_empty() {
                        done = true;
                        break;
                    }
                } else {
                    token.push(b);
                }
            }
            self.input.consume(used);
            if done {
                break;
            }
        }
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(String::from_utf8_lossy(&token).into_owned()))
        }
    }

    fn parse<T: FromStr>(&mut self, what: impl fmt::Display) -> Result<T, FederationError> {
        match self.next_token()? {
            None => Err(FederationError::parse(format!("missing {what}"))),
            Some(tok) => tok
                .parse()
                .map_err(|_| FederationError::parse(format!("bad {what}: {tok:?}"))),
        }
    }
}

/// Write a human-readable rendering of `fed`.
pub fn pretty_print(
    fed: &FedList,
    alloc: &DbmAllocator,
    format: &PrintFormat,
    out: &mut impl Write,
) -> io::Result<()> {
    let size = fed.len();
    let dim = fed.dim();
    let ruby = format.style == PrintStyle::Ruby;
    let prefix = format.prefix.as_str();

    if size == 0 {
        return if ruby {
            write!(out, "Fed({dim}) {{}}")
        } else {
            write!(out, "0 DBM {dim}x{dim}{{}}")
        };
    }

    if ruby {
        write!(out, "Fed({dim}) {{")?;
        if size > 1 {
            write!(out, "[\n{prefix}")?;
        }
        write!(out, " matrix\\\n")?;
    } else {
        let noun = if size > 1 { "DBMs" } else { "DBM" };
        write!(out, "{size} {noun} {dim}x{dim} {{\n")?;
    }

    if dim == 1 {
        write!(out, "{}", Raw::LE_ZERO)?;
        if ruby {
            return write!(out, " }}");
        }
        writeln!(out)?;
    } else {
        let mut members = fed.iter(alloc).peekable();
        while let Some(dbm) = members.next() {
            for row in dbm.chunks(dim) {
                out.write_all(prefix.as_bytes())?;
                for c in row {
                    write!(out, "{c}\t")?;
                }
                out.write_all(b"\\\n")?;
            }
            if members.peek().is_some() {
                let sep = if ruby { ",matrix\\\n" } else { ",\n" };
                write!(out, "{prefix}{sep}")?;
            }
        }
    }

    let close = if ruby && size > 1 { "]}" } else { "}" };
    write!(out, "{prefix}{close}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonefed_test_utils::zone;

    fn render(fed: &FedList, alloc: &DbmAllocator, format: &PrintFormat) -> String {
        let mut out = Vec::new();
        pretty_print(fed, alloc, format, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn serialized_text_layout() {
        let mut alloc = DbmAllocator::with_max_dim(2);
        let mut fed = FedList::new(2);
        fed.add_dbm(zone(2, &[(1, 0, 2)]).as_slice(), &mut alloc)
            .unwrap();
        let mut out = Vec::new();
        write_fed(&fed, &alloc, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1 2\n1 1\n5 1\n");
        fed.release(&mut alloc);
    }

    #[test]
    fn read_accepts_any_whitespace() {
        let mut alloc = DbmAllocator::with_max_dim(3);
        let mut fed = FedList::new(3);
        let mut input = "1\t2   1 1\n\n5\n1 trailing".as_bytes();
        read_fed(&mut fed, &mut alloc, &mut input).unwrap();
        assert_eq!(fed.dim(), 2);
        assert!(fed.has_dbm(zone(2, &[(1, 0, 2)]).as_slice(), &alloc));
        assert_eq!(input, b"trailing");
        fed.release(&mut alloc);
    }

    #[test]
    fn read_rejects_bad_input() {
        let mut alloc = DbmAllocator::with_max_dim(2);
        let mut fed = FedList::new(2);
        for text in ["", "1", "1 2 1 1 5", "1 2 1 x 5 1", "1 0", "1 2 1 -9 5 1"] {
            let err = read_fed(&mut fed, &mut alloc, &mut text.as_bytes()).unwrap_err();
            assert!(matches!(err, FederationError::Parse { .. }), "{text:?}: {err}");
        }
        let err = read_fed(&mut fed, &mut alloc, &mut "1 3".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            FederationError::DimensionTooLarge { dim: 3, max_dim: 2 }
        ));
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn bad_bound_names_its_position() {
        let mut alloc = DbmAllocator::with_max_dim(2);
        let mut fed = FedList::new(2);
        let text = "2 2 1 1 5 1 1 1 ? 1";
        match read_fed(&mut fed, &mut alloc, &mut text.as_bytes()) {
            Err(FederationError::Parse { detail }) => {
                assert_eq!(detail, "bad bound 2 of matrix 1: \"?\"");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fed.len(), 1);
        fed.release(&mut alloc);
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn plain_layout() {
        let mut alloc = DbmAllocator::with_max_dim(2);
        let mut fed = FedList::new(2);
        assert_eq!(render(&fed, &alloc, &PrintFormat::plain()), "0 DBM 2x2{}");
        fed.add_init(&mut alloc).unwrap();
        assert_eq!(
            render(&fed, &alloc, &PrintFormat::plain()),
            "1 DBM 2x2 {\n<=0\t<=0\t\\\n<inf\t<=0\t\\\n}"
        );
        fed.add_zero(&mut alloc).unwrap();
        let text = render(&fed, &alloc, &PrintFormat::plain().with_prefix("> "));
        assert!(text.starts_with("2 DBMs 2x2 {\n> "));
        assert!(text.contains("\\\n> ,\n> "));
        assert!(text.ends_with("\\\n> }"));
        fed.release(&mut alloc);
    }

    #[test]
    fn ruby_layout() {
        let mut alloc = DbmAllocator::with_max_dim(2);
        let mut fed = FedList::new(2);
        assert_eq!(render(&fed, &alloc, &PrintFormat::ruby()), "Fed(2) {}");
        fed.add_zero(&mut alloc).unwrap();
        assert_eq!(
            render(&fed, &alloc, &PrintFormat::ruby()),
            "Fed(2) { matrix\\\n<=0\t<=0\t\\\n<=0\t<=0\t\\\n}"
        );
        fed.add_init(&mut alloc).unwrap();
        let text = render(&fed, &alloc, &PrintFormat::ruby());
        assert!(text.starts_with("Fed(2) {[\n matrix\\\n"));
        assert!(text.contains(",matrix\\\n"));
        assert!(text.ends_with("]}"));
        fed.release(&mut alloc);
    }

    #[test]
    fn dim_one_layout() {
        let mut alloc = DbmAllocator::with_max_dim(1);
        let mut fed = FedList::new(1);
        fed.add_zero(&mut alloc).unwrap();
        assert_eq!(render(&fed, &alloc, &PrintFormat::plain()), "1 DBM 1x1 {\n<=0\n}");
        assert_eq!(render(&fed, &alloc, &PrintFormat::ruby()), "Fed(1) { matrix\\\n<=0 }");
        fed.release(&mut alloc);
    }
}

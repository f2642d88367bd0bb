use super::SectionSource;

/// An ordered, in-memory set of named sections.
///
/// Sections keep their insertion order, which is the discovery order seen by
/// [`SectionSource::for_each_section`]. Duplicate names are allowed; lookups by name return the
/// first one, like a section table would.
#[derive(Debug, Default, Clone)]
pub struct SectionMap {
    sections: Vec<(String, Vec<u8>)>,
}

impl SectionMap {
    /// Create an empty section map
    #[must_use]
    pub fn new() -> SectionMap {
        SectionMap::default()
    }

    /// Append a section.
    ///
    /// ## Arguments
    /// * 'name' - Section name, e.g. `.coremodule/400000`
    /// * 'data' - Section contents
    pub fn push(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.sections.push((name.into(), data.into()));
    }

    /// Builder form of [`SectionMap::push`].
    #[must_use]
    pub fn with_section(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.push(name, data);
        self
    }

    /// Number of sections
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// `true` if there are no sections
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl SectionSource for SectionMap {
    fn section_by_name(&self, name: &str) -> Option<&[u8]> {
        self.sections
            .iter()
            .find(|(section, _)| section == name)
            .map(|(_, data)| data.as_slice())
    }

    fn for_each_section(&self, visit: &mut dyn FnMut(&str, &[u8])) {
        for (name, data) in &self.sections {
            visit(name, data);
        }
    }
}

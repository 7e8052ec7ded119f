use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};

/// Class-index to display-name table, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn from_file(filepath: &Path) -> io::Result<ClassLabels> {
        let file = File::open(filepath)?;
        let reader = io::BufReader::new(file);
        let mut names = Vec::new();

        for line_result in reader.lines() {
            let line = line_result?;
            let name = line.trim();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }

        Ok(ClassLabels { names })
    }

    pub fn from_names(names: Vec<String>) -> ClassLabels {
        ClassLabels { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display name for a class index, with a stable fallback for indices
    /// the table does not cover.
    pub fn name_for(&self, class_id: usize) -> String {
        match self.names.get(class_id) {
            Some(name) => name.clone(),
            None => format!("class {}", class_id),
        }
    }
}

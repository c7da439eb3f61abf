//! File registry owning the source buffers tokens point into.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(u32);

pub struct SourceFile {
    pub path: String,
    pub contents: String,
}

#[derive(Default)]
pub struct SourceRegistry {
    files: Vec<SourceFile>,
    by_path: HashMap<String, FileId>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, contents: impl Into<String>) -> FileId {
        let path = path.into();
        if let Some(&id) = self.by_path.get(&path) {
            return id;
        }
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile {
            path: path.clone(),
            contents: contents.into(),
        });
        self.by_path.insert(path, id);
        id
    }

    pub fn get(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_get_round_trips() {
        let mut reg = SourceRegistry::new();
        let id = reg.add("a.c", "int main(){}");
        assert_eq!(reg.get(id).contents, "int main(){}");
    }

    #[test]
    fn adding_same_path_twice_returns_same_id() {
        let mut reg = SourceRegistry::new();
        let id1 = reg.add("a.c", "x");
        let id2 = reg.add("a.c", "x");
        assert_eq!(id1, id2);
    }
}

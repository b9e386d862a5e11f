use crate::allocator::total_capacity;
use crate::data::{ClassroomName, ClassroomSpec};
use crate::error::{ServiceError, ServiceResult};
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A stored classroom. `layout` is the seat designer's mask (1 = seat,
/// 0 = disabled); allocation only ever reads `rows` and `cols`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Classroom {
    pub rows: u32,
    pub cols: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Vec<Vec<u8>>>,
}

impl Classroom {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            layout: None,
        }
    }

    /// Seats the layout marks as usable; equals rows x cols without a mask.
    pub fn enabled_seats(&self) -> usize {
        match &self.layout {
            Some(layout) => layout.iter().flatten().filter(|&&s| s == 1).count(),
            None => (self.rows as usize).saturating_mul(self.cols as usize),
        }
    }

    fn validate(&self, name: &str) -> ServiceResult<()> {
        if self.rows < 1 || self.cols < 1 {
            return Err(ServiceError::Validation(format!(
                "classroom '{}' needs at least one row and one column",
                name
            )));
        }
        if let Some(layout) = &self.layout {
            let shaped = layout.len() == self.rows as usize
                && layout.iter().all(|row| row.len() == self.cols as usize);
            if !shaped {
                return Err(ServiceError::Validation(format!(
                    "layout for '{}' must be {} x {}",
                    name, self.rows, self.cols
                )));
            }
            if layout.iter().flatten().any(|&s| s > 1) {
                return Err(ServiceError::Validation(format!(
                    "layout for '{}' may only contain 0 and 1",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Classrooms in insertion order, which is also the order they fill in.
/// When backed by a file, every mutation rewrites the whole file.
#[derive(Debug, Default)]
pub struct ClassroomRegistry {
    rooms: IndexMap<ClassroomName, Classroom>,
    path: Option<PathBuf>,
}

impl ClassroomRegistry {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the registry at `path`, creating an empty one if it is missing.
    pub fn open(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let path = path.as_ref().to_path_buf();
        let rooms = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                IndexMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            fs::write(&path, "{}")?;
            IndexMap::new()
        };

        let registry = Self {
            rooms,
            path: Some(path),
        };
        for (name, room) in &registry.rooms {
            if let Err(e) = room.validate(name) {
                warn!("{}", e);
            }
            warn_disabled_seats(name, room);
        }
        info!(
            "Loaded {} classrooms ({} seats)",
            registry.rooms.len(),
            total_capacity(&registry.specs())
        );
        Ok(registry)
    }

    pub fn list(&self) -> &IndexMap<ClassroomName, Classroom> {
        &self.rooms
    }

    pub fn get(&self, name: &str) -> Option<&Classroom> {
        self.rooms.get(name.trim())
    }

    pub fn insert(&mut self, name: &str, room: Classroom) -> ServiceResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("classroom name is empty".into()));
        }
        if self.rooms.contains_key(name) {
            return Err(ServiceError::Conflict(format!(
                "classroom '{}' already exists",
                name
            )));
        }
        room.validate(name)?;
        warn_disabled_seats(name, &room);

        let mut next = self.rooms.clone();
        next.insert(name.to_string(), room);
        self.commit(next)?;
        info!("Added classroom '{}'", name);
        Ok(())
    }

    /// Resizes a classroom. A layout drawn for the old size no longer
    /// fits and is dropped.
    pub fn update(&mut self, name: &str, rows: u32, cols: u32) -> ServiceResult<&Classroom> {
        let name = name.trim();
        let room = self.get(name).ok_or_else(|| not_found(name))?;
        let same_shape = room.rows == rows && room.cols == cols;
        let resized = Classroom {
            rows,
            cols,
            layout: room.layout.clone().filter(|_| same_shape),
        };
        resized.validate(name)?;

        let mut next = self.rooms.clone();
        next.insert(name.to_string(), resized);
        self.commit(next)?;
        info!("Updated classroom '{}' to {} x {}", name, rows, cols);
        Ok(&self.rooms[name])
    }

    pub fn remove(&mut self, name: &str) -> ServiceResult<Classroom> {
        let name = name.trim();
        let mut next = self.rooms.clone();
        let room = next.shift_remove(name).ok_or_else(|| not_found(name))?;
        self.commit(next)?;
        info!("Removed classroom '{}'", name);
        Ok(room)
    }

    /// The registry as the allocator consumes it.
    pub fn specs(&self) -> Vec<ClassroomSpec> {
        self.rooms
            .iter()
            .map(|(name, room)| ClassroomSpec::new(name.clone(), room.rows, room.cols))
            .collect()
    }

    // memory only changes once the file write has succeeded
    fn commit(&mut self, next: IndexMap<ClassroomName, Classroom>) -> ServiceResult<()> {
        if let Some(path) = &self.path {
            fs::write(path, serde_json::to_string_pretty(&next)?)?;
        }
        self.rooms = next;
        Ok(())
    }
}

fn not_found(name: &str) -> ServiceError {
    ServiceError::NotFound(format!("classroom '{}'", name))
}

// disabled seats are a drawing aid only; allocation still fills the full grid
fn warn_disabled_seats(name: &str, room: &Classroom) {
    let grid = (room.rows as usize).saturating_mul(room.cols as usize);
    let enabled = room.enabled_seats();
    if enabled < grid {
        warn!(
            "classroom '{}' marks {} of {} seats disabled; they are still allocated",
            name,
            grid - enabled,
            grid
        );
    }
}

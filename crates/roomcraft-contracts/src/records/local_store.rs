use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use uuid::Uuid;

use super::{Design, DesignPatch, DesignStore, NewDesign};

/// `room_designs` kept in one pretty-printed JSON file keyed by design id.
///
/// Every call re-reads the file, so two stores pointed at the same path see
/// each other's writes. Last write wins per row.
#[derive(Debug)]
pub struct LocalDesignStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalDesignStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_rows<T>(
        &self,
        mutate: impl FnOnce(&mut BTreeMap<Uuid, Design>) -> anyhow::Result<(T, bool)>,
    ) -> anyhow::Result<T> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("design store lock poisoned"))?;
        let mut rows = read_rows(&self.path)?;
        let (out, dirty) = mutate(&mut rows)?;
        if dirty {
            write_rows(&self.path, &rows)?;
        }
        Ok(out)
    }
}

impl DesignStore for LocalDesignStore {
    fn insert(&self, design: &NewDesign) -> anyhow::Result<Design> {
        self.with_rows(|rows| {
            let row = Design {
                id: Uuid::new_v4(),
                user_id: design.user_id,
                title: design.title.clone(),
                description: design.description.clone(),
                style: design.style.clone(),
                room_type: design.room_type.clone(),
                price: design.price,
                image_url: design.image_url.clone(),
                ai_generated: design.ai_generated,
                is_featured: false,
                created_at: Utc::now(),
            };
            rows.insert(row.id, row.clone());
            Ok((row, true))
        })
    }

    fn update(&self, id: Uuid, patch: &DesignPatch) -> anyhow::Result<Design> {
        self.with_rows(|rows| {
            let Some(row) = rows.get_mut(&id) else {
                bail!("design {id} not found");
            };
            row.apply(patch);
            Ok((row.clone(), !patch.is_empty()))
        })
    }

    fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.with_rows(|rows| {
            if rows.remove(&id).is_none() {
                bail!("design {id} not found");
            }
            Ok(((), true))
        })
    }

    fn get(&self, id: Uuid) -> anyhow::Result<Option<Design>> {
        self.with_rows(|rows| Ok((rows.get(&id).cloned(), false)))
    }

    fn list_featured(&self) -> anyhow::Result<Vec<Design>> {
        self.with_rows(|rows| {
            let featured = rows.values().filter(|row| row.is_featured).cloned();
            Ok((newest_first(featured), false))
        })
    }

    fn list_owned(&self, user_id: Uuid) -> anyhow::Result<Vec<Design>> {
        self.with_rows(|rows| {
            let owned = rows.values().filter(|row| row.is_owned_by(user_id)).cloned();
            Ok((newest_first(owned), false))
        })
    }
}

fn newest_first(rows: impl Iterator<Item = Design>) -> Vec<Design> {
    let mut rows = rows.collect::<Vec<Design>>();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}

fn read_rows(path: &Path) -> anyhow::Result<BTreeMap<Uuid, Design>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&raw).with_context(|| format!("{} is not a design store", path.display()))
}

fn write_rows(path: &Path, rows: &BTreeMap<Uuid, Design>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(rows)?)
        .with_context(|| format!("failed writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::LocalDesignStore;
    use crate::design::{RoomType, Style};
    use crate::records::{DesignPatch, DesignStore, NewDesign};

    fn sample(owner: Uuid, style: Style) -> NewDesign {
        NewDesign::ai_generated(
            owner,
            style,
            RoomType::Bedroom,
            None,
            "data:image/png;base64,ZZZZ",
        )
    }

    #[test]
    fn insert_then_get_round_trips_through_the_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalDesignStore::new(temp.path().join("designs.json"));
        let owner = Uuid::new_v4();
        let saved = store.insert(&sample(owner, Style::Modern))?;

        let reopened = LocalDesignStore::new(store.path());
        assert_eq!(reopened.get(saved.id)?, Some(saved.clone()));
        assert!(!saved.is_featured);
        Ok(())
    }

    #[test]
    fn two_stores_on_one_path_see_each_other() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("designs.json");
        let store_a = LocalDesignStore::new(&path);
        let store_b = LocalDesignStore::new(&path);
        let owner = Uuid::new_v4();

        let first = store_a.insert(&sample(owner, Style::Modern))?;
        let second = store_b.insert(&sample(owner, Style::Traditional))?;
        assert_eq!(store_a.list_owned(owner)?.len(), 2);

        store_b.update(first.id, &DesignPatch::featured(true))?;
        let featured = store_a.list_featured()?;
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].id, first.id);

        store_a.delete(second.id)?;
        assert_eq!(store_b.get(second.id)?, None);
        Ok(())
    }

    #[test]
    fn listings_are_newest_first_and_scoped_to_owner() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalDesignStore::new(temp.path().join("designs.json"));
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let older = store.insert(&sample(owner, Style::Modern))?;
        std::thread::sleep(std::time::Duration::from_millis(5));
        let newer = store.insert(&sample(owner, Style::Minimalist))?;
        store.insert(&sample(other, Style::Industrial))?;

        let owned = store.list_owned(owner)?;
        assert_eq!(
            owned.iter().map(|row| row.id).collect::<Vec<Uuid>>(),
            vec![newer.id, older.id]
        );
        Ok(())
    }

    #[test]
    fn missing_rows_are_errors_for_mutations() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalDesignStore::new(temp.path().join("designs.json"));
        let missing = Uuid::new_v4();
        assert!(store.update(missing, &DesignPatch::featured(true)).is_err());
        assert!(store.delete(missing).is_err());
        assert_eq!(store.get(missing)?, None);
        Ok(())
    }
}

//! CRUD operations for [`Listing`] records, including nearby search.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use quartier_shared::geo::{filter_within_radius, sort_by_distance, GeoPoint};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Listing, ListingCategory};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new listing.
    pub fn insert_listing(&self, listing: &Listing) -> Result<()> {
        self.conn().execute(
            "INSERT INTO listings (id, title, category, lat, lon, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                listing.id.to_string(),
                listing.title,
                listing.category.as_str(),
                listing.lat,
                listing.lon,
                listing.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single listing by UUID.
    pub fn get_listing(&self, id: Uuid) -> Result<Listing> {
        self.conn()
            .query_row(
                "SELECT id, title, category, lat, lon, created_at
                 FROM listings WHERE id = ?1",
                params![id.to_string()],
                row_to_listing,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List all listings, newest first.
    pub fn list_listings(&self) -> Result<Vec<Listing>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, title, category, lat, lon, created_at
             FROM listings
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], row_to_listing)?;

        let mut listings = Vec::new();
        for row in rows {
            listings.push(row?);
        }
        Ok(listings)
    }

    /// Listings within `radius_km` of `origin`, nearest first.
    ///
    /// SQLite has no geodesic functions, so rows are fetched and filtered
    /// through the distance engine.  The radius boundary is inclusive.
    pub fn list_listings_within_radius(
        &self,
        origin: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<Listing>> {
        let all = self.list_listings()?;
        let within = filter_within_radius(all, origin, radius_km);
        Ok(sort_by_distance(within, origin))
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a listing by UUID.  Returns `true` if a row was deleted.
    pub fn delete_listing(&self, id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM listings WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Listing`].
fn row_to_listing(row: &rusqlite::Row<'_>) -> rusqlite::Result<Listing> {
    let id_str: String = row.get(0)?;
    let title: String = row.get(1)?;
    let category_str: String = row.get(2)?;
    let lat: f64 = row.get(3)?;
    let lon: f64 = row.get(4)?;
    let created_str: String = row.get(5)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let category = ListingCategory::from_str(&category_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown listing category: {category_str}").into(),
        )
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Listing {
        id,
        title,
        category,
        lat,
        lon,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db(dir: &tempfile::TempDir) -> Database {
        Database::open_at(&dir.path().join("test.db")).unwrap()
    }

    fn listing_at(title: &str, lat: f64, lon: f64) -> Listing {
        Listing {
            id: Uuid::new_v4(),
            title: title.into(),
            category: ListingCategory::Space,
            lat,
            lon,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        let listing = listing_at("Atelier on the canal", 52.3702, 4.8952);
        db.insert_listing(&listing).unwrap();

        assert_eq!(db.get_listing(listing.id).unwrap(), listing);
    }

    #[test]
    fn test_nearby_is_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        // Origin: central Berlin.
        let origin = GeoPoint::new(52.5200, 13.4050);

        let near = listing_at("Courtyard in Kreuzberg", 52.4986, 13.4034);
        let nearer = listing_at("Rooftop at Alexanderplatz", 52.5219, 13.4132);
        let far = listing_at("Munich beer hall", 48.1351, 11.5820);

        db.insert_listing(&near).unwrap();
        db.insert_listing(&nearer).unwrap();
        db.insert_listing(&far).unwrap();

        let found = db.list_listings_within_radius(origin, 50.0).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, nearer.id);
        assert_eq!(found[1].id, near.id);
    }

    #[test]
    fn test_delete_listing() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        let listing = listing_at("Pop-up kitchen", 48.8566, 2.3522);
        db.insert_listing(&listing).unwrap();

        assert!(db.delete_listing(listing.id).unwrap());
        assert!(matches!(
            db.get_listing(listing.id),
            Err(StoreError::NotFound)
        ));
    }
}

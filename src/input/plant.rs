//! Code for reading the plant roster.
use super::{check_non_negative, check_unique, input_err_msg, read_csv};
use crate::id::IDCollection;
use crate::plant::{Plant, PlantMap};
use crate::technology::{CLOSE_PLANT, TechnologyMap};
use crate::units::Capacity;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const PLANTS_FILE_NAME: &str = "plants.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct PlantRaw {
    id: String,
    name: String,
    country_code: String,
    region: String,
    start_of_operation: u32,
    end_of_operation: Option<u32>,
    initial_technology: String,
    capacity: Capacity,
    primary_capacity: Option<bool>,
}

impl PlantRaw {
    fn validate(&self) -> Result<()> {
        check_non_negative(self.capacity.value(), "capacity")?;
        if let Some(end) = self.end_of_operation {
            ensure!(
                end > self.start_of_operation,
                "end_of_operation ({end}) must be after start_of_operation ({})",
                self.start_of_operation
            );
        }

        Ok(())
    }
}

/// Read the plant roster from the model directory
pub fn read_plants(
    model_dir: &Path,
    technologies: &TechnologyMap,
    start_year: u32,
) -> Result<PlantMap> {
    let file_path = model_dir.join(PLANTS_FILE_NAME);
    let plants_csv = read_csv(&file_path)?;
    read_plants_from_iter(plants_csv, technologies, start_year)
        .with_context(|| input_err_msg(&file_path))
}

fn read_plants_from_iter<I>(
    iter: I,
    technologies: &TechnologyMap,
    start_year: u32,
) -> Result<PlantMap>
where
    I: Iterator<Item = PlantRaw>,
{
    let raws: Vec<_> = iter.collect();
    check_unique(raws.iter().map(|raw| raw.id.as_str()), "plant ID")?;

    let mut plants = PlantMap::new();
    for raw in raws {
        raw.validate()
            .with_context(|| format!("Invalid data for plant {}", raw.id))?;

        let initial_technology = if raw.initial_technology == CLOSE_PLANT {
            CLOSE_PLANT.into()
        } else {
            technologies
                .get_id_by_str(&raw.initial_technology)
                .with_context(|| format!("Invalid initial technology for plant {}", raw.id))?
        };

        let plant = Plant {
            id: raw.id.as_str().into(),
            name: raw.name,
            country_code: raw.country_code.into(),
            region_id: raw.region.into(),
            start_of_operation: raw.start_of_operation,
            end_of_operation: raw.end_of_operation,
            initial_technology,
            capacity: raw.capacity,
            primary_capacity: raw.primary_capacity.unwrap_or(true),
        };
        plants.insert(plant.id.clone(), plant);
    }

    ensure!(
        plants
            .values()
            .any(|plant| plant.end_of_operation.is_none_or(|end| end > start_year)),
        "No plant operates during the simulated years"
    );

    Ok(plants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, technologies};
    use crate::technology::TechnologyID;
    use rstest::{fixture, rstest};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[fixture]
    fn raw() -> PlantRaw {
        PlantRaw {
            id: "P1".into(),
            name: "Steelworks".into(),
            country_code: "DEU".into(),
            region: "EUR".into(),
            start_of_operation: 1990,
            end_of_operation: None,
            initial_technology: "Avg BF-BOF".into(),
            capacity: Capacity(2.5),
            primary_capacity: None,
        }
    }

    #[rstest]
    fn test_read_plants(technologies: TechnologyMap) {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(PLANTS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "id,name,country_code,region,start_of_operation,end_of_operation,initial_technology,capacity,primary_capacity
P1,Steelworks,DEU,EUR,1990,,Avg BF-BOF,2.5,
P2,Minimill,USA,NAM,2005,2040,EAF,1.0,false
P3,Old works,GBR,EUR,1960,,Close plant,0.5,true"
            )
            .unwrap();
        }

        let plants = read_plants(dir.path(), &technologies, 2020).unwrap();
        assert_eq!(plants.len(), 3);
        let p1 = &plants[0];
        assert_eq!(p1.region_id, "EUR".into());
        assert!(p1.primary_capacity);
        assert_eq!(p1.capacity, Capacity(2.5));
        let p2 = &plants[1];
        assert_eq!(p2.end_of_operation, Some(2040));
        assert!(!p2.primary_capacity);
        assert_eq!(plants[2].initial_technology, TechnologyID::from(CLOSE_PLANT));
    }

    #[rstest]
    fn test_read_plants_unknown_technology(technologies: TechnologyMap, mut raw: PlantRaw) {
        raw.initial_technology = "Magic".into();
        assert_error!(
            read_plants_from_iter(std::iter::once(raw), &technologies, 2020),
            "Invalid initial technology for plant P1"
        );
    }

    #[rstest]
    fn test_read_plants_invalid(technologies: TechnologyMap) {
        let duplicate = PlantRaw {
            name: "Copy".into(),
            ..raw()
        };
        assert_error!(
            read_plants_from_iter([raw(), duplicate].into_iter(), &technologies, 2020),
            "Duplicate plant ID: P1"
        );

        let closed_early = PlantRaw {
            end_of_operation: Some(1980),
            ..raw()
        };
        assert_error!(
            read_plants_from_iter(std::iter::once(closed_early), &technologies, 2020),
            "Invalid data for plant P1"
        );

        let retired = PlantRaw {
            end_of_operation: Some(2010),
            ..raw()
        };
        assert_error!(
            read_plants_from_iter(std::iter::once(retired), &technologies, 2020),
            "No plant operates during the simulated years"
        );
    }
}

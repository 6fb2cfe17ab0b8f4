//! Cópias de segurança
//!
//! JSON com máquinas, pedidos e personalizações; importação destrutiva
//! (apagar e recriar) sem rollback. CSV apenas para a tabela da frota, com
//! ordem de colunas fixa.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::clients::entity_client::strip_system_fields;
use crate::clients::{Collection, EntityClient};
use crate::models::backup::{BackupData, BackupDocument, CollectionImport, ImportSummary, BACKUP_VERSION};
use crate::models::machine::{derive_categoria, Caracteristicas, Machine, MachineState, Origem, Reserva};
use crate::repositories::MachineRepository;
use crate::services::duplicate_guard::{check_serial, SerialCheck};
use crate::utils::dates::parse_flexible;
use crate::utils::errors::{AppError, AppResult};

pub const CSV_HEADERS: [&str; 16] = [
    "ID",
    "Origem",
    "Modelo",
    "Serie",
    "Ano",
    "Estado",
    "Categoria",
    "Reserva_Cliente",
    "Reserva_Data",
    "Mastro",
    "Vias_Mastro",
    "Cor_Pneus",
    "Joystick",
    "Acessorio",
    "Data_Criacao",
    "Data_Atualizacao",
];

pub const CSV_REQUIRED_HEADERS: [&str; 3] = ["Modelo", "Serie", "Origem"];

pub struct BackupService {
    entities: Arc<dyn EntityClient>,
}

impl BackupService {
    pub fn new(entities: Arc<dyn EntityClient>) -> Self {
        Self { entities }
    }

    pub async fn export_json(&self) -> AppResult<BackupDocument> {
        let data = BackupData {
            machines: self.entities.list(Collection::Machines, None, None).await?,
            pedidos: self.entities.list(Collection::PartRequests, None, None).await?,
            customizations: self.entities.list(Collection::Customizations, None, None).await?,
        };
        info!(
            "💾 Backup exportado: {} máquinas, {} pedidos, {} personalizações",
            data.machines.len(),
            data.pedidos.len(),
            data.customizations.len()
        );
        Ok(BackupDocument {
            version: BACKUP_VERSION.to_string(),
            timestamp: Utc::now(),
            data,
        })
    }

    /// Apagar e recriar cada coleção; o erro indica até onde se chegou
    pub async fn import_json(&self, document: BackupDocument) -> AppResult<ImportSummary> {
        let BackupData {
            machines,
            pedidos,
            customizations,
        } = document.data;
        let mut summary = ImportSummary::default();

        for (collection, records) in [
            (Collection::Machines, machines),
            (Collection::PartRequests, pedidos),
            (Collection::Customizations, customizations),
        ] {
            match self.replace_collection(collection, &records).await {
                Ok(done) => summary.collections.push(done),
                Err((done, e)) => {
                    error!("❌ Restauro interrompido em {}: {}", collection, e);
                    return Err(AppError::Internal(format!(
                        "Restauro interrompido em {} ({} apagados, {} de {} criados; coleções concluídas: {}): {}",
                        collection,
                        done.deleted,
                        done.created,
                        records.len(),
                        summary.collections.len(),
                        e
                    )));
                }
            }
        }

        info!("✅ Backup restaurado: {} registos criados", summary.created());
        Ok(summary)
    }

    async fn replace_collection(
        &self,
        collection: Collection,
        records: &[Value],
    ) -> Result<CollectionImport, (CollectionImport, AppError)> {
        let mut done = CollectionImport {
            collection: collection.to_string(),
            ..Default::default()
        };

        let existing = match self.entities.list(collection, None, None).await {
            Ok(existing) => existing,
            Err(e) => return Err((done, e.into())),
        };
        for record in &existing {
            if let Some(id) = record.get("id").and_then(Value::as_str) {
                if let Err(e) = self.entities.delete(collection, id).await {
                    return Err((done, e.into()));
                }
                done.deleted += 1;
            }
        }

        for record in records {
            if let Err(e) = self.entities.create(collection, strip_system_fields(record)).await {
                return Err((done, e.into()));
            }
            done.created += 1;
        }
        Ok(done)
    }

    pub async fn export_csv(&self) -> AppResult<String> {
        let machines = MachineRepository::new(Arc::clone(&self.entities)).list_all().await?;
        machines_to_csv(&machines)
    }

    /// Una máquina por línea; las series ya existentes (en la frota o en
    /// líneas anteriores) quedan rechazadas
    pub async fn import_csv(&self, content: &str) -> AppResult<ImportSummary> {
        let (rows, mut rejected_rows) = machines_from_csv(content)?;
        let repository = MachineRepository::new(Arc::clone(&self.entities));
        let mut known = repository.list_all().await?;

        let mut done = CollectionImport {
            collection: Collection::Machines.to_string(),
            ..Default::default()
        };
        for (line, machine) in rows {
            let reason = match check_serial(&known, &machine.serie) {
                SerialCheck::Unique => None,
                SerialCheck::ReturnFromRental(rented) => Some(format!(
                    "Série {} em aluguer (máquina {}); confirmar o regresso",
                    machine.serie, rented.id
                )),
                SerialCheck::Duplicate(_) => Some(format!("Série {} duplicada", machine.serie)),
            };
            if let Some(reason) = reason {
                rejected_rows.push((line, reason));
                continue;
            }
            known.push(repository.create(&machine).await?);
            done.created += 1;
        }
        rejected_rows.sort_by_key(|(line, _)| *line);
        info!("✅ CSV importado: {} máquinas, {} linhas rejeitadas", done.created, rejected_rows.len());

        Ok(ImportSummary {
            collections: vec![done],
            rejected_rows,
        })
    }
}

fn csv_error(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("CSV inválido: {}", e))
}

/// Tabla de la frota en CSV con las 16 columnas fijas
pub fn machines_to_csv(machines: &[Machine]) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS).map_err(|e| AppError::Internal(e.to_string()))?;

    for m in machines {
        let carac = &m.caracteristicas;
        let reserva = m.reserva.as_ref();
        let row = [
            m.id.clone(),
            m.origem.to_string(),
            m.modelo.clone(),
            m.serie.clone(),
            m.ano.map(|a| a.to_string()).unwrap_or_default(),
            m.estado.to_string(),
            m.categoria.clone().unwrap_or_default(),
            reserva.map(|r| r.cliente.clone()).unwrap_or_default(),
            reserva
                .and_then(|r| r.data)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            carac.mastro.clone().unwrap_or_default(),
            carac.vias_mastro.clone().unwrap_or_default(),
            carac.cor_pneus.clone().unwrap_or_default(),
            match carac.joystick {
                Some(true) => "Sim".to_string(),
                Some(false) => "Não".to_string(),
                None => String::new(),
            },
            carac.acessorio.clone().unwrap_or_default(),
            m.created_date.clone().unwrap_or_default(),
            m.updated_date.clone().unwrap_or_default(),
        ];
        writer.write_record(&row).map_err(|e| AppError::Internal(e.to_string()))?;
    }

    let bytes = writer.into_inner().map_err(|e| AppError::Internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
}

/// Máquinas a criar y filas rechazadas (línea, motivo)
/// Filas válidas con su número de línea, y filas rechazadas con el motivo
pub fn machines_from_csv(content: &str) -> AppResult<(Vec<(usize, Machine)>, Vec<(usize, String)>)> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

    let headers = reader.headers().map_err(csv_error)?.clone();
    let missing: Vec<&str> = CSV_REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Cabeçalhos obrigatórios em falta: {}",
            missing.join(", ")
        )));
    }

    let column = |name: &str| headers.iter().position(|h| h == name);
    let columns: Vec<Option<usize>> = CSV_HEADERS.iter().map(|h| column(*h)).collect();

    let mut machines = Vec::new();
    let mut rejected = Vec::new();
    for (index, row) in reader.records().enumerate() {
        // Cabecera en la línea 1
        let line = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                rejected.push((line, e.to_string()));
                continue;
            }
        };
        let field = |name: &str| -> Option<String> {
            let position = CSV_HEADERS.iter().position(|h| *h == name)?;
            columns[position]
                .and_then(|i| row.get(i))
                .map(str::to_string)
                .filter(|v| !v.is_empty())
        };

        match machine_from_row(&field) {
            Ok(machine) => machines.push((line, machine)),
            Err(reason) => rejected.push((line, reason)),
        }
    }

    Ok((machines, rejected))
}

fn machine_from_row(field: &dyn Fn(&str) -> Option<String>) -> Result<Machine, String> {
    let modelo = field("Modelo").ok_or("Modelo vazio")?;
    let serie = field("Serie").ok_or("Série vazia")?;
    let origem_raw = field("Origem").ok_or("Origem vazia")?;
    let origem = Origem::parse(&origem_raw).ok_or_else(|| format!("Origem desconhecida '{}'", origem_raw))?;
    let ano = match field("Ano") {
        Some(raw) => Some(raw.parse::<i32>().map_err(|_| format!("Ano inválido '{}'", raw))?),
        None => None,
    };

    let estado = field("Estado").map(|e| MachineState::parse(&e)).unwrap_or_default();
    let categoria = field("Categoria").unwrap_or_else(|| derive_categoria(&modelo).to_string());
    let reserva = field("Reserva_Cliente").map(|cliente| Reserva {
        cliente,
        data: field("Reserva_Data").as_deref().and_then(parse_flexible),
        comercial: None,
    });
    let joystick = field("Joystick").and_then(|j| match j.to_lowercase().as_str() {
        "sim" | "true" | "s" => Some(true),
        "não" | "nao" | "false" | "n" => Some(false),
        _ => None,
    });

    Ok(Machine {
        tecnico: estado.technician().map(str::to_string),
        modelo,
        serie,
        ano,
        origem,
        categoria: Some(categoria),
        estado,
        reserva,
        caracteristicas: Caracteristicas {
            mastro: field("Mastro"),
            vias_mastro: field("Vias_Mastro"),
            cor_pneus: field("Cor_Pneus"),
            joystick,
            acessorio: field("Acessorio"),
            ..Default::default()
        },
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryEntityClient;
    use serde_json::json;

    #[test]
    fn test_csv_header_order() {
        let csv = machines_to_csv(&[]).unwrap();
        assert_eq!(
            csv.trim_end(),
            "ID,Origem,Modelo,Serie,Ano,Estado,Categoria,Reserva_Cliente,Reserva_Data,Mastro,Vias_Mastro,Cor_Pneus,Joystick,Acessorio,Data_Criacao,Data_Atualizacao"
        );
    }

    #[test]
    fn test_csv_missing_required_headers() {
        let err = machines_from_csv("Modelo,Ano\nE16,2020\n").unwrap_err();
        match err {
            AppError::BadRequest(msg) => {
                assert!(msg.contains("Serie"));
                assert!(msg.contains("Origem"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_csv_subset_import_and_rejections() {
        let content = "Serie,Modelo,Origem,Joystick,Estado\n\
                       A1,E16,STS,Sim,Em Aluguer\n\
                       ,E20,nova,,\n\
                       A3,R14,marte,,\n";
        let (machines, rejected) = machines_from_csv(content).unwrap();
        assert_eq!(machines.len(), 1);
        let (line, machine) = &machines[0];
        assert_eq!(*line, 2);
        assert_eq!(machine.origem, Origem::Sts);
        assert_eq!(machine.caracteristicas.joystick, Some(true));
        assert!(machine.estado.is_in_rental());
        assert_eq!(machine.categoria.as_deref(), Some("Empilhador Elétrico"));
        assert_eq!(rejected.iter().map(|(l, _)| *l).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_csv_export_then_import_keeps_fleet() {
        let machine = Machine {
            id: "m1".into(),
            modelo: "H25D".into(),
            serie: "TX-9".into(),
            ano: Some(2018),
            origem: Origem::Uts,
            estado: MachineState::InPreparation("nuno".into()),
            caracteristicas: Caracteristicas {
                cor_pneus: Some("branco".into()),
                joystick: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };
        let csv = machines_to_csv(&[machine]).unwrap();
        let (machines, rejected) = machines_from_csv(&csv).unwrap();
        assert!(rejected.is_empty());
        let (_, machine) = &machines[0];
        assert_eq!(machine.serie, "TX-9");
        assert_eq!(machine.tecnico.as_deref(), Some("nuno"));
        assert_eq!(machine.caracteristicas.joystick, Some(false));
    }

    #[tokio::test]
    async fn test_json_round_trip_counts() {
        let entities: Arc<dyn EntityClient> = Arc::new(InMemoryEntityClient::new());
        for serie in ["A1", "A2", "A3"] {
            entities
                .create(Collection::Machines, json!({"serie": serie, "modelo": "E16"}))
                .await
                .unwrap();
        }
        entities
            .create(Collection::PartRequests, json!({"numeroPedido": "1", "maquinaId": "x"}))
            .await
            .unwrap();
        entities
            .create(Collection::Customizations, json!({"tema": "escuro"}))
            .await
            .unwrap();

        let service = BackupService::new(Arc::clone(&entities));
        let document = service.export_json().await.unwrap();
        let summary = service.import_json(document).await.unwrap();

        assert_eq!(summary.created(), 5);
        let machines = entities.list(Collection::Machines, None, None).await.unwrap();
        assert_eq!(machines.len(), 3);
        assert_eq!(entities.list(Collection::PartRequests, None, None).await.unwrap().len(), 1);
        assert_eq!(entities.list(Collection::Customizations, None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_csv_reimport_rejects_known_series() {
        let entities: Arc<dyn EntityClient> = Arc::new(InMemoryEntityClient::new());
        let service = BackupService::new(Arc::clone(&entities));
        let content = "Origem,Modelo,Serie\n\
                       nova,E16,CSV-1\n\
                       sts,R14,CSV-2\n\
                       uts,E20,csv-1 \n";

        let first = service.import_csv(content).await.unwrap();
        assert_eq!(first.created(), 2);
        assert_eq!(first.rejected_rows.len(), 1);
        assert_eq!(first.rejected_rows[0].0, 4);

        let second = service.import_csv(content).await.unwrap();
        assert_eq!(second.created(), 0);
        assert_eq!(
            second.rejected_rows.iter().map(|(l, _)| *l).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
        assert_eq!(entities.list(Collection::Machines, None, None).await.unwrap().len(), 2);
    }
}

//! PDF report formatter
//!
//! Renders the report as a flat plan of typed lines, then lays the plan out
//! on A4 pages with the built-in Helvetica fonts. Page breaks happen
//! between lines, never inside one.
//!
//! Built-in fonts carry WinAnsi encoding only, so all report strings stay
//! plain ASCII.

use anyhow::Result;
use chrono::Utc;
use printpdf::{BuiltinFont, Mm, PdfDocument};

use frantoio_common::db::models::{Cassone, MolituraRiepilogo};

enum Riga {
    Titolo(String),
    Intestazione(String),
    Campo(String, String),
    /// Two-column table row; the flag marks header and total rows
    Tabella(String, String, bool),
    Vuota,
}

/// Render the report for the selected moliture, oldest first as provided
/// by the caller.
pub fn render_report(moliture: &[(MolituraRiepilogo, Vec<Cassone>)]) -> Result<Vec<u8>> {
    let righe = build_righe(moliture);

    let (doc, prima_pagina, primo_layer) =
        PdfDocument::new("Report Moliture", Mm(210.0), Mm(297.0), "contenuto");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow::anyhow!("PDF font error: {}", e))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow::anyhow!("PDF font error: {}", e))?;

    let mut layer = doc.get_page(prima_pagina).get_layer(primo_layer);
    let mut y = 277.0;

    for riga in &righe {
        let altezza = match riga {
            Riga::Titolo(_) => 12.0,
            Riga::Intestazione(_) => 9.0,
            Riga::Campo(_, _) => 6.0,
            Riga::Tabella(_, _, _) => 6.0,
            Riga::Vuota => 4.0,
        };

        if y - altezza < 20.0 {
            let (pagina, nuovo_layer) = doc.add_page(Mm(210.0), Mm(297.0), "contenuto");
            layer = doc.get_page(pagina).get_layer(nuovo_layer);
            y = 277.0;
        }

        match riga {
            Riga::Titolo(testo) => {
                layer.use_text(testo.as_str(), 16.0, Mm(20.0), Mm(y), &bold);
            }
            Riga::Intestazione(testo) => {
                layer.use_text(testo.as_str(), 12.0, Mm(20.0), Mm(y), &bold);
            }
            Riga::Campo(etichetta, valore) => {
                layer.use_text(etichetta.as_str(), 9.0, Mm(22.0), Mm(y), &bold);
                layer.use_text(valore.as_str(), 9.0, Mm(70.0), Mm(y), &font);
            }
            Riga::Tabella(numero, quantita, evidenzia) => {
                let carattere = if *evidenzia { &bold } else { &font };
                layer.use_text(numero.as_str(), 9.0, Mm(25.0), Mm(y), carattere);
                layer.use_text(quantita.as_str(), 9.0, Mm(80.0), Mm(y), carattere);
            }
            Riga::Vuota => {}
        }

        y -= altezza;
    }

    doc.save_to_bytes()
        .map_err(|e| anyhow::anyhow!("PDF serialization error: {}", e))
}

fn build_righe(moliture: &[(MolituraRiepilogo, Vec<Cassone>)]) -> Vec<Riga> {
    let mut righe = vec![
        Riga::Titolo("REPORT MOLITURE - FRANTOIO OLEARIO".to_string()),
        Riga::Campo(
            "Generato il:".to_string(),
            Utc::now().format("%d/%m/%Y %H:%M").to_string(),
        ),
        Riga::Vuota,
        Riga::Intestazione("RIEPILOGO".to_string()),
    ];

    let totale_cassoni: i64 = moliture.iter().map(|(m, _)| m.numero_cassoni).sum();
    let totale_quantita: i64 = moliture.iter().map(|(m, _)| m.quantita_totale).sum();

    righe.push(Riga::Campo(
        "Numero moliture:".to_string(),
        moliture.len().to_string(),
    ));
    righe.push(Riga::Campo(
        "Totale cassoni:".to_string(),
        totale_cassoni.to_string(),
    ));
    righe.push(Riga::Campo(
        "Quantita totale (kg):".to_string(),
        totale_quantita.to_string(),
    ));
    righe.push(Riga::Vuota);
    righe.push(Riga::Intestazione("DETTAGLIO MOLITURE".to_string()));

    for (molitura, cassoni) in moliture {
        righe.push(Riga::Vuota);
        righe.push(Riga::Intestazione(format!(
            "Molitura del {} - {}",
            molitura.data_ora.format("%d/%m/%Y"),
            molitura.cliente_nome
        )));
        righe.push(Riga::Campo(
            "Cliente:".to_string(),
            molitura.cliente_nome.clone(),
        ));
        righe.push(Riga::Campo(
            "Data/Ora:".to_string(),
            molitura.data_ora.format("%d/%m/%Y %H:%M").to_string(),
        ));
        righe.push(Riga::Campo(
            "Sezione:".to_string(),
            molitura.sezione.to_string(),
        ));
        righe.push(Riga::Campo(
            "Stato:".to_string(),
            molitura.stato.as_str().to_uppercase(),
        ));
        if let Some(note) = &molitura.note {
            righe.push(Riga::Campo("Note:".to_string(), note.clone()));
        }

        if !cassoni.is_empty() {
            righe.push(Riga::Tabella(
                "Numero cassone".to_string(),
                "Quantita (kg)".to_string(),
                true,
            ));
            for cassone in cassoni {
                righe.push(Riga::Tabella(
                    cassone.numero_cassone.to_string(),
                    cassone.quantita.to_string(),
                    false,
                ));
            }
            righe.push(Riga::Tabella(
                "TOTALE".to_string(),
                molitura.quantita_totale.to_string(),
                true,
            ));
        }
    }

    righe
}

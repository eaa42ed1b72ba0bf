#[cfg(feature = "compression-gzip")]
mod gzip_tests {
    use anyhow::Result;
    use cineload::io::compression::{
        auto_detect_reader, available_codecs, has_compressed_extension, open_decompressed,
    };
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::{BufRead, Cursor, Read, Write};

    fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes)?;
        Ok(enc.finish()?)
    }

    #[test]
    fn gzip_is_registered() {
        assert!(available_codecs().contains(&"gzip"));
        assert!(has_compressed_extension("movie-list.json.gz"));
        assert!(has_compressed_extension("MOVIES.CSV.GZ"));
        assert!(!has_compressed_extension("movies.csv"));
    }

    #[test]
    fn decompresses_by_extension() -> Result<()> {
        let data = gzip(b"{\"id\": 1}\n{\"id\": 2}\n")?;
        let mut out = String::new();
        auto_detect_reader(Cursor::new(data), "dump.json.gz")?.read_to_string(&mut out)?;
        assert_eq!(out.lines().count(), 2);
        Ok(())
    }

    #[test]
    fn decompresses_by_magic_bytes() -> Result<()> {
        let data = gzip(b"id,title\n1,Alien\n")?;
        let mut out = String::new();
        auto_detect_reader(Cursor::new(data), "download.tmp")?.read_to_string(&mut out)?;
        assert!(out.starts_with("id,title"));
        Ok(())
    }

    #[test]
    fn plain_text_passes_through() -> Result<()> {
        let mut out = String::new();
        auto_detect_reader(Cursor::new(b"plain".to_vec()), "notes.txt")?
            .read_to_string(&mut out)?;
        assert_eq!(out, "plain");
        Ok(())
    }

    #[test]
    fn open_decompressed_reads_lines() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("movies.csv.gz");
        std::fs::write(&path, gzip(b"id,title\n1,Alien\n2,Aliens\n")?)?;

        let lines = open_decompressed(&path)?
            .lines()
            .collect::<std::io::Result<Vec<_>>>()?;
        assert_eq!(lines, vec!["id,title", "1,Alien", "2,Aliens"]);
        Ok(())
    }
}

#[cfg(feature = "compression-zstd")]
mod zstd_tests {
    use anyhow::Result;
    use cineload::io::compression::{auto_detect_reader, available_codecs};
    use std::io::{Cursor, Read};

    #[test]
    fn zstd_round_trip() -> Result<()> {
        assert!(available_codecs().contains(&"zstd"));
        let data = zstd::encode_all(Cursor::new(b"{\"id\": 7}\n".to_vec()), 3)?;
        let mut out = String::new();
        auto_detect_reader(Cursor::new(data), "dump.json.zst")?.read_to_string(&mut out)?;
        assert_eq!(out.trim(), "{\"id\": 7}");
        Ok(())
    }
}

#[test]
fn missing_file_is_an_error() {
    let res = cineload::io::compression::open_decompressed("/definitely/not/here.json");
    assert!(res.is_err());
}

//! Fixed sample documents and identifiers for the ESA CCI Open Data Portal
//! protocols this workspace speaks: OpenSearch ODD, ISO-19115 DESCXML, and
//! DAP2 DDS/DAS/.dods.

/// A minimal OpenSearch description document (ODD) exposing both a
/// multi-option parameter (`ecv`) and a single-option parameter
/// (`processingLevel`), exercising the singular/plural harmoniser.
pub const SAMPLE_ODD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<os:OpenSearchDescription xmlns:os="http://a9.com/-/spec/opensearch/1.1/"
                           xmlns:param="http://a9.com/-/spec/opensearch/extensions/parameters/1.0/">
  <os:ShortName>ESA CCI Open Data Portal</os:ShortName>
  <os:Url type="application/atom+xml"
          template="http://opensearch-test.ceda.ac.uk/opensearch/request?{os:searchTerms}{param:ecv}{param:processingLevel}{os:startPage}{os:count}">
    <param:Parameter name="ecv" value="{os:searchTerms}">
      <param:Option value="OZONE" label="Ozone"/>
      <param:Option value="SST" label="Sea Surface Temperature"/>
      <param:Option value="SOILMOISTURE" label="Soil Moisture"/>
    </param:Parameter>
    <param:Parameter name="processingLevel" value="{os:searchTerms}">
      <param:Option value="L3" label="Level 3"/>
    </param:Parameter>
  </os:Url>
  <os:Query role="example" ecv="OZONE" processingLevel="L3"/>
</os:OpenSearchDescription>
"#;

/// A minimal ISO-19115 DESCXML with a bounding box and two
/// `CI_DateTypeCode` entries (creation, and a temporal extent begin/end pair).
pub const SAMPLE_DESCXML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gmi:MI_Metadata xmlns:gmi="http://www.isotc211.org/2005/gmi"
                  xmlns:gmd="http://www.isotc211.org/2005/gmd"
                  xmlns:gml="http://www.opengis.net/gml/3.2"
                  xmlns:gco="http://www.isotc211.org/2005/gco">
  <gmd:identificationInfo>
    <gmd:MD_DataIdentification>
      <gmd:citation>
        <gmd:CI_Citation>
          <gmd:title><gco:CharacterString>ESA CCI Ozone Level 3 Merged Data Product</gco:CharacterString></gmd:title>
          <gmd:date>
            <gmd:CI_Date>
              <gmd:date><gco:DateTime>2016-05-01T00:00:00</gco:DateTime></gmd:date>
              <gmd:dateType><gmd:CI_DateTypeCode codeListValue="creation">creation</gmd:CI_DateTypeCode></gmd:dateType>
            </gmd:CI_Date>
          </gmd:date>
          <gmd:date>
            <gmd:CI_Date>
              <gmd:date><gco:DateTime>2017-02-14T00:00:00</gco:DateTime></gmd:date>
              <gmd:dateType><gmd:CI_DateTypeCode codeListValue="publication">publication</gmd:CI_DateTypeCode></gmd:dateType>
            </gmd:CI_Date>
          </gmd:date>
        </gmd:CI_Citation>
      </gmd:citation>
      <gmd:abstract><gco:CharacterString>Merged multi-sensor ozone column data.</gco:CharacterString></gmd:abstract>
      <gmd:resourceConstraints>
        <gmd:MD_Constraints>
          <gmd:useLimitation><gco:CharacterString>Free and open use.</gco:CharacterString></gmd:useLimitation>
        </gmd:MD_Constraints>
      </gmd:resourceConstraints>
      <gmd:resourceFormat>
        <gmd:MD_Format>
          <gmd:name><gco:CharacterString>Data are in NetCDF format</gco:CharacterString></gmd:name>
        </gmd:MD_Format>
      </gmd:resourceFormat>
      <gmd:extent>
        <gmd:EX_Extent>
          <gmd:geographicElement>
            <gmd:EX_GeographicBoundingBox>
              <gmd:westBoundLongitude><gco:Decimal>-180.0</gco:Decimal></gmd:westBoundLongitude>
              <gmd:eastBoundLongitude><gco:Decimal>180.0</gco:Decimal></gmd:eastBoundLongitude>
              <gmd:southBoundLatitude><gco:Decimal>-90.0</gco:Decimal></gmd:southBoundLatitude>
              <gmd:northBoundLatitude><gco:Decimal>90.0</gco:Decimal></gmd:northBoundLatitude>
            </gmd:EX_GeographicBoundingBox>
          </gmd:geographicElement>
          <gmd:temporalElement>
            <gmd:EX_TemporalExtent>
              <gmd:extent>
                <gml:TimePeriod gml:id="period1">
                  <gml:beginPosition>1997-09-01T00:00:00</gml:beginPosition>
                  <gml:endPosition>2020-12-31T23:59:59</gml:endPosition>
                </gml:TimePeriod>
              </gmd:extent>
            </gmd:EX_TemporalExtent>
          </gmd:temporalElement>
        </gmd:EX_Extent>
      </gmd:extent>
    </gmd:MD_DataIdentification>
  </gmd:identificationInfo>
</gmi:MI_Metadata>
"#;

/// The DDS text half of the sample DAP2 grid: `time(2) x lat(3) x lon(4)`.
pub const SAMPLE_DDS: &str = r#"Dataset {
    Float32 analysed_sst[time = 2][lat = 3][lon = 4];
    Float64 time[time = 2];
    Float64 lat[lat = 3];
    Float64 lon[lon = 4];
} esacci_sst;
"#;

/// The DAS text half of the sample DAP2 grid.
pub const SAMPLE_DAS: &str = r#"Attributes {
    analysed_sst {
        String long_name "analysed sea surface temperature";
        Float32 _FillValue -32768.0;
        String units "kelvin";
    }
    time {
        String units "seconds since 1981-01-01 00:00:00";
    }
    lat {
        String units "degrees_north";
    }
    lon {
        String units "degrees_east";
    }
}
"#;

/// Realistic parseable DRS identifiers, including a `_bnds` coordinate
/// variable and a dataset whose latitude axis is stored descending.
pub const SAMPLE_DRS_IDS: &[&str] = &[
    "esacci.OZONE.mon.L3.NP.multi-sensor.multi-platform.MERGED.fv0002.r1",
    "esacci.SEALEVEL.day.L4.MSLA.multi-sensor.multi-platform.MERGED.fv2.0.r1",
    "esacci.SST.day.L4.SSTdepth.multi-sensor.multi-platform.OSTIA.fv2.1.r1",
    "esacci.SOILMOISTURE.day.L3S.SSMV.multi-sensor.multi-platform.ACTIVE.fv04.7.r1",
];

/// A variable name exercising the `_bnds` suffix convention.
pub const SAMPLE_BNDS_VARIABLE: &str = "lat_bnds";

/// The dataset id whose latitude axis is stored north-to-south (descending).
pub const FLIPPED_LATITUDE_DATASET: &str =
    "esacci.SST.day.L4.SSTdepth.multi-sensor.multi-platform.OSTIA.fv2.1.r1";

/// A miniature "drs ids that should never be surfaced" exclusion list, in
/// the one-id-per-line text format the catalog resolver reads verbatim.
pub const SAMPLE_DATASET_EXCLUSION_LIST: &str = "\
esacci.OZONE.mon.L3.NP.multi-sensor.multi-platform.MERGED.fv0001.r1
esacci.CLOUD.month.L3C.CLD_PRODUCTS.MODIS.Terra.MODIS_TERRA.v2.0.r1
";

/// A miniature "variables that should never be surfaced" exclusion list.
pub const SAMPLE_VARIABLE_EXCLUSION_LIST: &str = "\
crs
transverse_mercator
";

/// Returns the DAP2 `.dods` payload matching [`SAMPLE_DDS`]: the DDS text
/// followed by `Data:\n` and the big-endian binary encoding of the three
/// coordinate arrays and one data array, in declaration order.
///
/// Each numeric array is encoded DAP2-style as the element count repeated
/// twice (4-byte big-endian `u32`), followed by the elements themselves in
/// big-endian order with no padding.
pub fn sample_dods_payload() -> Vec<u8> {
    let mut body = Vec::new();
    crate::generators::encode_dap_array_f32(
        &mut body,
        &[
            10.0, 10.1, 10.2, 10.3, //
            11.0, 11.1, 11.2, 11.3, //
            12.0, 12.1, 12.2, 12.3,
        ],
    );
    crate::generators::encode_dap_array_f64(&mut body, &[0.0, 86400.0]);
    crate::generators::encode_dap_array_f64(&mut body, &[40.0, 41.0, 42.0]);
    crate::generators::encode_dap_array_f64(&mut body, &[-10.0, -9.0, -8.0, -7.0]);

    let mut payload = Vec::with_capacity(SAMPLE_DDS.len() + 6 + body.len());
    payload.extend_from_slice(SAMPLE_DDS.as_bytes());
    payload.extend_from_slice(b"\nData:\n");
    payload.extend_from_slice(&body);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_xml_mentions_both_multi_and_single_option_parameters() {
        assert!(SAMPLE_ODD_XML.contains("name=\"ecv\""));
        assert!(SAMPLE_ODD_XML.contains("name=\"processingLevel\""));
        assert_eq!(SAMPLE_ODD_XML.matches("param:Option").count(), 4);
    }

    #[test]
    fn descxml_has_bbox_and_two_date_kinds() {
        assert!(SAMPLE_DESCXML.contains("EX_GeographicBoundingBox"));
        assert!(SAMPLE_DESCXML.contains("beginPosition"));
        assert!(SAMPLE_DESCXML.contains("codeListValue=\"creation\""));
    }

    #[test]
    fn drs_ids_all_start_with_esacci_and_have_ten_fields() {
        for id in SAMPLE_DRS_IDS {
            assert!(id.starts_with("esacci."));
            assert_eq!(id.split('.').count(), 10, "{id}");
        }
    }

    #[test]
    fn dods_payload_starts_with_dds_text_and_data_marker() {
        let payload = sample_dods_payload();
        let text = String::from_utf8_lossy(&payload[..SAMPLE_DDS.len() + 7]);
        assert!(text.ends_with("Data:\n"));
    }
}
